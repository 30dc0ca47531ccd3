use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use herbwell_core::BundleId;

use super::PgDatabase;
use crate::db::{BundleRepository, RepositoryError, conflict_on_unique};
use crate::models::{Bundle, BundleInput, BundleItem};

const BUNDLE_COLUMNS: &str = "id, name, slug, description, price, original_price, image_url, \
     items, is_active, is_featured, is_bestseller, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BundleRow {
    id: BundleId,
    name: String,
    slug: String,
    description: Option<String>,
    price: Decimal,
    original_price: Option<Decimal>,
    image_url: Option<String>,
    items: Json<Vec<BundleItem>>,
    is_active: bool,
    is_featured: bool,
    is_bestseller: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BundleRow> for Bundle {
    fn from(row: BundleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            image_url: row.image_url,
            items: row.items.0,
            is_active: row.is_active,
            is_featured: row.is_featured,
            is_bestseller: row.is_bestseller,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SLUG_TAKEN: &str = "bundle slug already exists";

#[async_trait]
impl BundleRepository for PgDatabase {
    async fn list_bundles(&self, active_only: bool) -> Result<Vec<Bundle>, RepositoryError> {
        let sql = format!(
            "SELECT {BUNDLE_COLUMNS} FROM bundles WHERE is_active OR NOT $1 ORDER BY created_at DESC"
        );
        let rows: Vec<BundleRow> = sqlx::query_as(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Bundle::from).collect())
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Option<Bundle>, RepositoryError> {
        let sql = format!("SELECT {BUNDLE_COLUMNS} FROM bundles WHERE id = $1");
        let row: Option<BundleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Bundle::from))
    }

    async fn get_bundle_by_slug(&self, slug: &str) -> Result<Option<Bundle>, RepositoryError> {
        let sql = format!("SELECT {BUNDLE_COLUMNS} FROM bundles WHERE slug = $1");
        let row: Option<BundleRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Bundle::from))
    }

    async fn create_bundle(&self, input: BundleInput) -> Result<Bundle, RepositoryError> {
        let bundle = input.into_bundle(BundleId::generate(), Utc::now());
        let sql = format!(
            "INSERT INTO bundles ({BUNDLE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {BUNDLE_COLUMNS}"
        );
        let row: BundleRow = sqlx::query_as(&sql)
            .bind(bundle.id)
            .bind(&bundle.name)
            .bind(&bundle.slug)
            .bind(&bundle.description)
            .bind(bundle.price)
            .bind(bundle.original_price)
            .bind(&bundle.image_url)
            .bind(Json(&bundle.items))
            .bind(bundle.is_active)
            .bind(bundle.is_featured)
            .bind(bundle.is_bestseller)
            .bind(bundle.created_at)
            .bind(bundle.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;
        Ok(row.into())
    }

    async fn update_bundle(
        &self,
        id: BundleId,
        input: BundleInput,
    ) -> Result<Option<Bundle>, RepositoryError> {
        let sql = format!(
            "UPDATE bundles SET name = $2, slug = $3, description = $4, price = $5, \
                original_price = $6, image_url = $7, items = $8, is_active = $9, \
                is_featured = $10, is_bestseller = $11, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BUNDLE_COLUMNS}"
        );
        let row: Option<BundleRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(input.slug.trim())
            .bind(&input.description)
            .bind(input.price)
            .bind(input.original_price)
            .bind(&input.image_url)
            .bind(Json(&input.items))
            .bind(input.is_active)
            .bind(input.is_featured)
            .bind(input.is_bestseller)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;
        Ok(row.map(Bundle::from))
    }

    async fn delete_bundle(&self, id: BundleId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM bundles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
