use async_trait::async_trait;
use chrono::{DateTime, Utc};

use herbwell_core::{UserId, raw_uuids};

use super::PgDatabase;
use crate::db::{ProfileRepository, RepositoryError};
use crate::models::Profile;

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: UserId,
    full_name: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProfileRepository for PgDatabase {
    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, full_name, email, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(
            "SELECT id, full_name, email, created_at FROM profiles ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn get_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>, RepositoryError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(
            "SELECT id, full_name, email, created_at FROM profiles WHERE id = ANY($1)",
        )
        .bind(raw_uuids(ids))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }
}
