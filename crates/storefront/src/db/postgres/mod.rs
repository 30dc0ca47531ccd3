//! `PostgreSQL` implementation of the repository traits.
//!
//! Queries are built at runtime (`sqlx::query_as` + `FromRow`) because the
//! category tables share one row shape and are selected by name.

mod bundles;
mod catalog;
mod emails;
mod orders;
mod profiles;
mod reviews;

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Database, RepositoryError};

/// Repository over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (used for the session store and migrations).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse a TEXT status column.
fn parse_column<T>(column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Convert an INTEGER quantity column.
fn quantity_column(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity in database: {value}")))
}
