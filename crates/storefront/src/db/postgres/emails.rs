use async_trait::async_trait;
use chrono::{DateTime, Utc};

use herbwell_core::{EmailLogId, OrderId};

use super::{PgDatabase, parse_column};
use crate::db::{EmailLogRepository, RepositoryError};
use crate::models::{EmailLogEntry, NewEmailLog};

const EMAIL_COLUMNS: &str = "id, order_id, recipient, subject, kind, status, error, created_at";

#[derive(sqlx::FromRow)]
struct EmailRow {
    id: EmailLogId,
    order_id: Option<OrderId>,
    recipient: String,
    subject: String,
    kind: String,
    status: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EmailRow> for EmailLogEntry {
    type Error = RepositoryError;

    fn try_from(row: EmailRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            recipient: row.recipient,
            subject: row.subject,
            kind: row.kind,
            status: parse_column("email status", &row.status)?,
            error: row.error,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl EmailLogRepository for PgDatabase {
    async fn record_email(&self, entry: NewEmailLog) -> Result<EmailLogEntry, RepositoryError> {
        let sql = format!(
            "INSERT INTO emails (id, order_id, recipient, subject, kind, status, error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {EMAIL_COLUMNS}"
        );
        let row: EmailRow = sqlx::query_as(&sql)
            .bind(EmailLogId::generate())
            .bind(entry.order_id)
            .bind(&entry.recipient)
            .bind(&entry.subject)
            .bind(&entry.kind)
            .bind(entry.status.as_str())
            .bind(&entry.error)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn list_emails_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<EmailLogEntry>, RepositoryError> {
        let sql = format!(
            "SELECT {EMAIL_COLUMNS} FROM emails WHERE order_id = $1 ORDER BY created_at"
        );
        let rows: Vec<EmailRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EmailLogEntry::try_from).collect()
    }
}
