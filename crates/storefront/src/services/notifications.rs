//! Order status notifications.
//!
//! Delivery runs on a detached task. The status update that triggered it has
//! already been persisted and answered; whatever happens here only shows up
//! in logs and in the `emails` audit table.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span, warn};

use herbwell_core::{Email, EmailDeliveryStatus, OrderStatus, format_money};

use super::email::{EmailError, EmailLine, Mailer, OrderStatusEmail, ShipmentInfo};
use crate::db::{Database, RepositoryError};
use crate::models::email_log::KIND_ORDER_STATUS;
use crate::models::order::tracking_reference;
use crate::models::{NewEmailLog, Order, OrderItem};

/// Days between shipping and the estimated delivery date.
pub const DELIVERY_ESTIMATE_DAYS: i64 = 5;

/// Name used when the address carries none.
const FALLBACK_CUSTOMER_NAME: &str = "Customer";

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("order has no shipping address")]
    MissingAddress,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// What happened to one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { recipient: Email },
    /// Neither the address nor the profile had a usable email.
    NoRecipient,
}

/// Sends status emails in the background.
#[derive(Clone)]
pub struct Notifier {
    db: Arc<dyn Database>,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    #[must_use]
    pub fn new(db: Arc<dyn Database>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Spawn delivery of the email for `order`'s current status.
    ///
    /// Returns at once. Failures are logged inside the task.
    pub fn dispatch(&self, order: Order, previous: OrderStatus) -> JoinHandle<()> {
        let db = Arc::clone(&self.db);
        let mailer = Arc::clone(&self.mailer);
        let span = info_span!(
            "order_notification",
            order_number = %order.order_number,
            from = %previous,
            to = %order.status,
        );

        tokio::spawn(
            async move {
                match deliver(db.as_ref(), mailer.as_ref(), &order).await {
                    Ok(DeliveryOutcome::Sent { recipient }) => {
                        info!(recipient = %recipient, "Order status email sent");
                    }
                    Ok(DeliveryOutcome::NoRecipient) => {
                        info!("No valid recipient email, notification skipped");
                    }
                    Err(e) => warn!(error = %e, "Order status notification failed"),
                }
            }
            .instrument(span),
        )
    }
}

/// Resolve the recipient, compose, send and audit one notification.
///
/// # Errors
///
/// Returns an error if a lookup fails or the mailer rejects the message.
/// A rejected message is still recorded in the audit table.
pub async fn deliver(
    db: &dyn Database,
    mailer: &dyn Mailer,
    order: &Order,
) -> Result<DeliveryOutcome, NotificationError> {
    let address_id = order
        .shipping_address_id
        .ok_or(NotificationError::MissingAddress)?;
    let address = db
        .get_address(address_id)
        .await?
        .ok_or(NotificationError::MissingAddress)?;

    let recipient = match address.contact_email() {
        Some(email) => Some(email),
        None => match order.user_id {
            Some(user_id) => db
                .get_profile(user_id)
                .await?
                .and_then(|profile| profile.contact_email()),
            None => None,
        },
    };
    let Some(recipient) = recipient else {
        return Ok(DeliveryOutcome::NoRecipient);
    };

    let items = db.list_order_items(&[order.id]).await?;
    let customer_name = if address.full_name.trim().is_empty() {
        FALLBACK_CUSTOMER_NAME
    } else {
        address.full_name.trim()
    };
    let email = compose_status_email(order, customer_name, &items, Utc::now());
    let sent = mailer.send_order_status(&recipient, &email).await;

    let audit = NewEmailLog {
        order_id: Some(order.id),
        recipient: recipient.to_string(),
        subject: email.subject(),
        kind: KIND_ORDER_STATUS.to_owned(),
        status: if sent.is_ok() {
            EmailDeliveryStatus::Sent
        } else {
            EmailDeliveryStatus::Failed
        },
        error: sent.as_ref().err().map(ToString::to_string),
    };
    if let Err(e) = db.record_email(audit).await {
        warn!(error = %e, "Failed to record email audit row");
    }

    sent?;
    Ok(DeliveryOutcome::Sent { recipient })
}

/// Build the email for an order's current status.
#[must_use]
pub fn compose_status_email(
    order: &Order,
    customer_name: &str,
    items: &[OrderItem],
    now: DateTime<Utc>,
) -> OrderStatusEmail {
    let shipment = (order.status == OrderStatus::Shipped).then(|| ShipmentInfo {
        tracking_number: tracking_reference(&order.order_number),
        estimated_delivery: (now + Duration::days(DELIVERY_ESTIMATE_DAYS))
            .format("%B %-d, %Y")
            .to_string(),
    });

    OrderStatusEmail {
        order_number: order.order_number.clone(),
        customer_name: customer_name.to_owned(),
        status: order.status,
        lines: items
            .iter()
            .map(|item| EmailLine {
                name: item.product_name.clone(),
                quantity: item.quantity,
                line_total: item.line_total().map(format_money).unwrap_or_default(),
            })
            .collect(),
        subtotal: format_money(order.subtotal),
        shipping: format_money(order.shipping_cost),
        total: format_money(order.total),
        shipment,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    use herbwell_core::{OrderId, OrderItemId, PaymentMethod, PaymentStatus, UserId};

    use super::*;
    use crate::db::{MemoryDatabase, OrderRepository};
    use crate::models::{NewAddress, Profile};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, OrderStatusEmail)>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_order_status(
            &self,
            to: &Email,
            email: &OrderStatusEmail,
        ) -> Result<(), EmailError> {
            if self.fail {
                return Err(EmailError::Delivery("relay refused".to_string()));
            }
            self.sent
                .lock()
                .await
                .push((to.to_string(), email.clone()));
            Ok(())
        }
    }

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::generate(),
            order_number: "HW-20240315-7KQ2ZD".to_string(),
            user_id: None,
            shipping_address_id: None,
            subtotal: Decimal::new(34_00, 2),
            shipping_cost: Decimal::new(4_99, 2),
            total: Decimal::new(38_99, 2),
            status,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn address(email: Option<&str>) -> NewAddress {
        NewAddress {
            user_id: None,
            full_name: "Ada Moss".to_string(),
            email: email.map(str::to_string),
            phone: None,
            line1: "1 Fern Way".to_string(),
            line2: None,
            city: "Portland".to_string(),
            state: Some("OR".to_string()),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
            is_default: false,
        }
    }

    #[test]
    fn test_shipped_email_has_tracking_and_eta() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let items = [OrderItem {
            id: OrderItemId::generate(),
            order_id: OrderId::generate(),
            product_id: None,
            product_name: "Lavender Soap".to_string(),
            product_category: None,
            quantity: 2,
            price: Decimal::new(12_00, 2),
        }];
        let email = compose_status_email(&order(OrderStatus::Shipped), "Ada", &items, now);
        let shipment = email.shipment.unwrap();
        assert!(shipment.tracking_number.starts_with("HW20240315"));
        assert_eq!(shipment.estimated_delivery, "March 20, 2024");
        assert_eq!(email.lines[0].line_total, "$24.00");
        assert_eq!(email.total, "$38.99");
    }

    #[test]
    fn test_non_shipped_email_has_no_tracking() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let email = compose_status_email(&order(status), "Ada", &[], Utc::now());
            assert!(email.shipment.is_none());
        }
    }

    #[tokio::test]
    async fn test_deliver_prefers_address_email_and_audits() {
        let db = MemoryDatabase::new();
        let stored = db
            .insert_address(address(Some("ada@herbwell.test")))
            .await
            .unwrap();
        let mut order = order(OrderStatus::Processing);
        order.shipping_address_id = Some(stored.id);
        let mailer = RecordingMailer::default();

        let outcome = deliver(&db, &mailer, &order).await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Sent { .. }));
        let sent = mailer.sent.lock().await;
        assert_eq!(sent[0].0, "ada@herbwell.test");

        let audit = db.emails().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].status, EmailDeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_deliver_falls_back_to_profile_email() {
        let db = MemoryDatabase::new();
        let user_id = UserId::generate();
        db.insert_profile(Profile {
            id: user_id,
            full_name: Some("Ada Moss".to_string()),
            email: Some("profile@herbwell.test".to_string()),
            created_at: Utc::now(),
        })
        .await;
        let stored = db.insert_address(address(Some("not an email"))).await.unwrap();
        let mut order = order(OrderStatus::Delivered);
        order.shipping_address_id = Some(stored.id);
        order.user_id = Some(user_id);
        let mailer = RecordingMailer::default();

        deliver(&db, &mailer, &order).await.unwrap();
        assert_eq!(mailer.sent.lock().await[0].0, "profile@herbwell.test");
    }

    #[tokio::test]
    async fn test_deliver_skips_without_recipient() {
        let db = MemoryDatabase::new();
        let stored = db.insert_address(address(None)).await.unwrap();
        let mut order = order(OrderStatus::Shipped);
        order.shipping_address_id = Some(stored.id);
        let mailer = RecordingMailer::default();

        let outcome = deliver(&db, &mailer, &order).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::NoRecipient);
        assert!(db.emails().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_is_audited() {
        let db = MemoryDatabase::new();
        let stored = db
            .insert_address(address(Some("ada@herbwell.test")))
            .await
            .unwrap();
        let mut order = order(OrderStatus::Cancelled);
        order.shipping_address_id = Some(stored.id);
        let mailer = RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        };

        assert!(deliver(&db, &mailer, &order).await.is_err());
        let audit = db.emails().await;
        assert_eq!(audit[0].status, EmailDeliveryStatus::Failed);
        assert!(audit[0].error.as_deref().unwrap().contains("relay refused"));
    }
}
