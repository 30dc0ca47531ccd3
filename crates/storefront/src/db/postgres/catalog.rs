//! Category tables and the legacy `products` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use herbwell_core::{Category, ProductId};

use super::PgDatabase;
use crate::db::{CatalogRepository, RepositoryError};
use crate::models::{Product, ProductDetails};

const PRODUCT_COLUMNS: &str = "id, title, slug, description, price, image_url, stock_quantity, \
     in_stock, tags, badges, attributes, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    slug: String,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    stock_quantity: i32,
    in_stock: bool,
    tags: Vec<String>,
    badges: Vec<String>,
    attributes: Value,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, category: Category) -> Result<Product, RepositoryError> {
        let details = ProductDetails::from_attributes(category, self.attributes).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid attributes for {category} product {}: {e}",
                self.id
            ))
        })?;
        Ok(Product {
            id: self.id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            stock_quantity: self.stock_quantity,
            in_stock: self.in_stock,
            tags: self.tags,
            badges: self.badges,
            created_at: self.created_at,
            details,
        })
    }
}

fn into_products(rows: Vec<ProductRow>, category: Category) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(|row| row.into_product(category)).collect()
}

impl PgDatabase {
    /// Insert or update a product by `(category, slug)`. Used by the seeder.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {table} ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (slug) DO UPDATE SET \
                title = EXCLUDED.title, description = EXCLUDED.description, \
                price = EXCLUDED.price, image_url = EXCLUDED.image_url, \
                stock_quantity = EXCLUDED.stock_quantity, in_stock = EXCLUDED.in_stock, \
                tags = EXCLUDED.tags, badges = EXCLUDED.badges, attributes = EXCLUDED.attributes",
            table = product.category().table_name()
        );
        sqlx::query(&sql)
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.slug)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.image_url)
            .bind(product.stock_quantity)
            .bind(product.in_stock)
            .bind(&product.tags)
            .bind(&product.badges)
            .bind(product.details.to_attributes())
            .bind(product.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for PgDatabase {
    async fn list_products(&self, category: Category) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} ORDER BY created_at DESC",
            category.table_name()
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        into_products(rows, category)
    }

    async fn get_product_by_slug(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE slug = $1",
            category.table_name()
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_product(category)).transpose()
    }

    async fn get_product_by_id(
        &self,
        category: Category,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = $1",
            category.table_name()
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_product(category)).transpose()
    }

    async fn list_related_products(
        &self,
        product: &Product,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let category = product.category();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} \
             WHERE slug <> $1 \
             ORDER BY (attributes ->> $2 = $3) IS TRUE DESC, created_at DESC \
             LIMIT $4",
            category.table_name()
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(&product.slug)
            .bind(product.details.shared_attribute_key())
            .bind(product.details.shared_attribute())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        into_products(rows, category)
    }

    async fn get_legacy_product_name(
        &self,
        id: ProductId,
    ) -> Result<Option<String>, RepositoryError> {
        let name: Option<String> = sqlx::query_scalar("SELECT title FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}
