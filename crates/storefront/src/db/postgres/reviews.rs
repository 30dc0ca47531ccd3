use async_trait::async_trait;
use chrono::{DateTime, Utc};

use herbwell_core::{ProductId, Rating, ReviewId, UserId, raw_uuids};

use super::{PgDatabase, parse_column};
use crate::db::{RepositoryError, ReviewRepository, conflict_on_unique};
use crate::models::{NewReview, Review};

const REVIEW_COLUMNS: &str = "id, user_id, product_id, product_category, rating, comment, created_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    user_id: UserId,
    product_id: ProductId,
    product_category: Option<String>,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

fn rating_column(value: i16) -> Result<Rating, RepositoryError> {
    Rating::new(i64::from(value))
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid rating in database: {e}")))
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            product_category: row
                .product_category
                .as_deref()
                .map(|c| parse_column("product category", c))
                .transpose()?,
            rating: rating_column(row.rating)?,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ReviewRepository for PgDatabase {
    async fn list_reviews_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<ReviewRow> = sqlx::query_as(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Review::try_from).collect()
    }

    async fn list_ratings_for_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, Rating)>, RepositoryError> {
        let rows: Vec<(ProductId, i16)> =
            sqlx::query_as("SELECT product_id, rating FROM reviews WHERE product_id = ANY($1)")
                .bind(raw_uuids(product_ids))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|(product_id, rating)| Ok((product_id, rating_column(rating)?)))
            .collect()
    }

    async fn find_review(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND product_id = $2"
        );
        let row: Option<ReviewRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Review::try_from).transpose()
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let sql = format!(
            "INSERT INTO reviews (id, user_id, product_id, product_category, rating, comment) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row: ReviewRow = sqlx::query_as(&sql)
            .bind(ReviewId::generate())
            .bind(review.user_id)
            .bind(review.product_id)
            .bind(review.product_category.map(|c| c.table_name()))
            .bind(i16::from(review.rating.get()))
            .bind(&review.comment)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "user already reviewed this product"))?;
        row.try_into()
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC");
        let rows: Vec<ReviewRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Review::try_from).collect()
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
