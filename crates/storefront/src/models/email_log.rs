//! Audit rows for notification emails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herbwell_core::{EmailDeliveryStatus, EmailLogId, OrderId};

/// Kind recorded for order status notifications.
pub const KIND_ORDER_STATUS: &str = "order_status";

/// One send attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmailLog {
    pub order_id: Option<OrderId>,
    pub recipient: String,
    pub subject: String,
    pub kind: String,
    pub status: EmailDeliveryStatus,
    pub error: Option<String>,
}

/// A stored audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLogEntry {
    pub id: EmailLogId,
    pub order_id: Option<OrderId>,
    pub recipient: String,
    pub subject: String,
    pub kind: String,
    pub status: EmailDeliveryStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
