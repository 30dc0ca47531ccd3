//! Checkout and order status management.
//!
//! Placing an order validates the cart before touching the database, so a
//! rejected checkout leaves no rows behind. The order row and its items are
//! written together; the shipping address is written first, on its own.
//!
//! Status updates persist first and notify second. The notification runs
//! detached (see [`crate::services::notifications`]) and cannot change the
//! outcome of the update.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use herbwell_core::cart::CartItem;
use herbwell_core::{
    AddressId, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ShippingPolicy, UserId,
};

use super::notifications::Notifier;
use crate::db::{Database, RepositoryError};
use crate::error::add_breadcrumb;
use crate::models::order::generate_order_number;
use crate::models::{NewAddress, NewOrder, NewOrderItem, Order, OrderItem};

#[derive(Debug, Error)]
pub enum OrderError {
    /// Input rejected before anything was written.
    #[error("{0}")]
    Validation(String),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("failed to persist order: {0}")]
    Repository(#[from] RepositoryError),
}

/// Shipping and contact details submitted at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    /// Reuse a saved address instead of the fields below.
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "address")]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "zipCode")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Mark a newly inserted address as the customer's default.
    #[serde(default)]
    pub save_as_default: bool,
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_data: Option<OrderData>,
    pub cart_items: Vec<CartItem>,
    pub user_id: Option<UserId>,
    pub payment_intent_id: Option<String>,
}

/// A stored order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

/// Result of a status update.
#[derive(Debug)]
pub struct StatusUpdate {
    pub order: Order,
    pub previous_status: OrderStatus,
    /// Handle of the detached notification, when one was sent.
    pub notification: Option<JoinHandle<()>>,
}

/// Subtotal, shipping and total of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Price a cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` when a line or the total overflows.
    pub fn for_cart(items: &[CartItem], shipping: &ShippingPolicy) -> Result<Self, OrderError> {
        let too_large = || OrderError::Validation("order total is too large".to_string());

        let subtotal = items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))
            .ok_or_else(too_large)?;
        let shipping = shipping.shipping_for(subtotal);
        let total = subtotal.checked_add(shipping).ok_or_else(too_large)?;
        Ok(Self {
            subtotal,
            shipping,
            total,
        })
    }
}

/// Order service.
pub struct OrderService<'a> {
    db: &'a dyn Database,
    shipping: ShippingPolicy,
    notifier: &'a Notifier,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database, shipping: ShippingPolicy, notifier: &'a Notifier) -> Self {
        Self {
            db,
            shipping,
            notifier,
        }
    }

    /// Place an order from a cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for an empty cart, a bad line, a
    /// total too large to represent or incomplete shipping details (nothing
    /// is written in that case), and
    /// `OrderError::Repository` if a write fails.
    #[instrument(skip_all, fields(user_id = ?request.user_id, lines = request.cart_items.len()))]
    pub async fn create_order(&self, request: PlaceOrder) -> Result<PlacedOrder, OrderError> {
        let PlaceOrder {
            order_data,
            cart_items,
            user_id,
            payment_intent_id,
        } = request;

        validate_cart(&cart_items)?;
        let totals = OrderTotals::for_cart(&cart_items, &self.shipping)?;
        let data = order_data
            .ok_or_else(|| OrderError::Validation("order data is required".to_string()))?;
        let new_address = match data.address_id {
            Some(_) => None,
            None => Some(address_from(&data, user_id)?),
        };

        let address = match (data.address_id, new_address) {
            (Some(id), _) => self
                .db
                .get_address(id)
                .await?
                .ok_or_else(|| OrderError::Validation(format!("address {id} does not exist")))?,
            (None, Some(address)) => self.db.insert_address(address).await?,
            (None, None) => {
                return Err(OrderError::Validation(
                    "shipping address is required".to_string(),
                ));
            }
        };

        let payment_method = data.payment_method.unwrap_or_default();
        let now = Utc::now();
        let new_order = NewOrder {
            id: OrderId::generate(),
            order_number: generate_order_number(now),
            user_id,
            shipping_address_id: Some(address.id),
            subtotal: totals.subtotal,
            shipping_cost: totals.shipping,
            total: totals.total,
            payment_method,
            notes: data.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
        };
        let items = cart_items
            .into_iter()
            .map(|item| NewOrderItem {
                product_id: Some(item.product_id),
                product_name: item.title,
                product_category: Some(item.category),
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        let (mut order, order_items) = self.db.insert_order(new_order, items).await?;

        if let Some(intent) = payment_intent_id.filter(|i| !i.trim().is_empty()) {
            if payment_method.captures_online() {
                order = self.db.mark_order_paid(order.id, intent.trim()).await?;
            } else {
                warn!(
                    order_number = %order.order_number,
                    payment_method = %payment_method,
                    "Payment intent ignored for cash-on-delivery order"
                );
            }
        }

        info!(
            order_number = %order.order_number,
            total = %order.total,
            payment_status = %order.payment_status,
            "Order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_number", order.order_number.as_str())]),
        );

        Ok(PlacedOrder { order, order_items })
    }

    /// Move an order to `new_status` and notify the customer.
    ///
    /// Payment status follows the new status: `failed` for cancelled orders,
    /// `pending` otherwise. A notification is dispatched only when the status
    /// changed and the order has a shipping address.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist and
    /// `OrderError::Repository` if the update cannot be persisted.
    #[instrument(skip(self), fields(order_id = %order_id, status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<StatusUpdate, OrderError> {
        let current = self
            .db
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        let previous_status = current.status;

        if previous_status != new_status && !previous_status.can_transition_to(new_status) {
            warn!(
                from = %previous_status,
                to = %new_status,
                "Order status moved outside the normal lifecycle"
            );
        }

        let payment_status = PaymentStatus::for_order_status(new_status);
        let order = self
            .db
            .update_order_status(order_id, new_status, payment_status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound(order_id),
                other => OrderError::Repository(other),
            })?;

        let notification = (previous_status != new_status && order.shipping_address_id.is_some())
            .then(|| self.notifier.dispatch(order.clone(), previous_status));

        info!(
            order_number = %order.order_number,
            from = %previous_status,
            notified = notification.is_some(),
            "Order status updated"
        );

        Ok(StatusUpdate {
            order,
            previous_status,
            notification,
        })
    }
}

fn validate_cart(items: &[CartItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::Validation("cart is empty".to_string()));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(OrderError::Validation(format!(
                "quantity for {} must be at least 1",
                item.title
            )));
        }
        if item.price.is_sign_negative() {
            return Err(OrderError::Validation(format!(
                "price for {} cannot be negative",
                item.title
            )));
        }
    }
    Ok(())
}

fn required(value: Option<&String>, field: &str) -> Result<String, OrderError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| OrderError::Validation(format!("{field} is required")))
}

fn optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn address_from(data: &OrderData, user_id: Option<UserId>) -> Result<NewAddress, OrderError> {
    let email = match optional(data.email.as_ref()) {
        Some(raw) => Some(
            Email::parse(&raw)
                .map_err(|e| OrderError::Validation(format!("invalid email: {e}")))?
                .into_inner(),
        ),
        None => None,
    };

    Ok(NewAddress {
        user_id,
        full_name: required(data.full_name.as_ref(), "full name")?,
        email,
        phone: optional(data.phone.as_ref()),
        line1: required(data.line1.as_ref(), "address")?,
        line2: optional(data.line2.as_ref()),
        city: required(data.city.as_ref(), "city")?,
        state: optional(data.state.as_ref()),
        postal_code: required(data.postal_code.as_ref(), "postal code")?,
        country: required(data.country.as_ref(), "country")?,
        is_default: data.save_as_default && user_id.is_some(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use herbwell_core::{Category, ProductId};

    use super::*;
    use crate::db::memory::tables;
    use crate::db::{MemoryDatabase, OrderRepository};
    use crate::services::email::LogMailer;

    fn line(title: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            title: title.to_string(),
            image: None,
            price: Decimal::new(cents, 2),
            category: Category::Soaps,
            slug: title.to_lowercase(),
            quantity,
            in_stock: true,
        }
    }

    fn order_data() -> OrderData {
        OrderData {
            full_name: Some("Ada Moss".to_string()),
            email: Some("ada@herbwell.test".to_string()),
            line1: Some("1 Fern Way".to_string()),
            city: Some("Portland".to_string()),
            postal_code: Some("97201".to_string()),
            country: Some("US".to_string()),
            ..OrderData::default()
        }
    }

    fn setup() -> (Arc<MemoryDatabase>, Notifier) {
        let db = Arc::new(MemoryDatabase::new());
        let notifier = Notifier::new(db.clone(), Arc::new(LogMailer));
        (db, notifier)
    }

    fn place(items: Vec<CartItem>) -> PlaceOrder {
        PlaceOrder {
            order_data: Some(order_data()),
            cart_items: items,
            user_id: None,
            payment_intent_id: None,
        }
    }

    #[test]
    fn test_totals_below_threshold() {
        let totals = OrderTotals::for_cart(
            &[line("Soap", 12_00, 2), line("Tea", 10_00, 1)],
            &ShippingPolicy::default(),
        )
        .unwrap();
        assert_eq!(totals.subtotal, Decimal::new(34_00, 2));
        assert_eq!(totals.shipping, Decimal::new(4_99, 2));
        assert_eq!(totals.total, Decimal::new(38_99, 2));
    }

    #[test]
    fn test_totals_free_shipping() {
        let totals =
            OrderTotals::for_cart(&[line("Oil", 25_00, 2)], &ShippingPolicy::default()).unwrap();
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(50_00, 2));
    }

    #[test]
    fn test_totals_overflow_is_a_validation_error() {
        let mut huge = line("Gold Balm", 1, 2);
        huge.price = Decimal::MAX;
        assert!(matches!(
            OrderTotals::for_cart(&[huge], &ShippingPolicy::default()),
            Err(OrderError::Validation(_))
        ));

        // each line fits but the sum does not
        let mut a = line("A", 1, 1);
        a.price = Decimal::MAX;
        let b = line("B", 1_00, 1);
        assert!(OrderTotals::for_cart(&[a, b], &ShippingPolicy::default()).is_err());
    }

    #[tokio::test]
    async fn test_overflowing_cart_writes_nothing() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);
        let mut huge = line("Gold Balm", 1, 2);
        huge.price = Decimal::MAX;
        // an address write would surface as a repository error
        db.set_unavailable(tables::ADDRESSES, true).await;

        let err = service.create_order(place(vec![huge])).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert!(db.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_persists_order_and_items() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);

        let placed = service
            .create_order(place(vec![line("Soap", 12_00, 2), line("Tea", 10_00, 1)]))
            .await
            .unwrap();

        assert_eq!(placed.order.total, Decimal::new(38_99, 2));
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
        assert_eq!(placed.order_items.len(), 2);
        assert!(placed.order.order_number.starts_with("HW-"));
        assert!(placed.order.shipping_address_id.is_some());
    }

    #[tokio::test]
    async fn test_empty_cart_writes_nothing() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);

        let err = service.create_order(place(Vec::new())).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert!(db.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_order_data_rejected() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);
        let mut request = place(vec![line("Soap", 12_00, 1)]);
        request.order_data = None;

        assert!(matches!(
            service.create_order(request).await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_line_rejected() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);

        let zero = service.create_order(place(vec![line("Soap", 12_00, 0)])).await;
        assert!(matches!(zero, Err(OrderError::Validation(_))));

        let negative = service.create_order(place(vec![line("Soap", -1, 1)])).await;
        assert!(matches!(negative, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_card_payment_intent_marks_paid() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);
        let mut request = place(vec![line("Soap", 12_00, 1)]);
        if let Some(data) = request.order_data.as_mut() {
            data.payment_method = Some(PaymentMethod::Card);
        }
        request.payment_intent_id = Some("pi_123".to_string());

        let placed = service.create_order(request).await.unwrap();
        assert_eq!(placed.order.payment_status, PaymentStatus::Paid);
        assert_eq!(placed.order.payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[tokio::test]
    async fn test_cash_on_delivery_never_paid() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);
        let mut request = place(vec![line("Soap", 12_00, 1)]);
        request.payment_intent_id = Some("pi_123".to_string());

        let placed = service.create_order(request).await.unwrap();
        assert_eq!(placed.order.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
        assert!(placed.order.payment_intent_id.is_none());
    }

    #[tokio::test]
    async fn test_items_failure_leaves_no_order() {
        let (db, notifier) = setup();
        db.set_unavailable(tables::ORDER_ITEMS, true).await;
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);

        let err = service
            .create_order(place(vec![line("Soap", 12_00, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Repository(_)));
        assert!(db.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_sets_payment_and_notifies_on_change() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);
        let placed = service
            .create_order(place(vec![line("Soap", 12_00, 1)]))
            .await
            .unwrap();

        let update = service
            .update_status(placed.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(update.previous_status, OrderStatus::Pending);
        assert_eq!(update.order.payment_status, PaymentStatus::Failed);
        update.notification.unwrap().await.unwrap();
        assert_eq!(db.emails().await.len(), 1);

        let again = service
            .update_status(placed.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(again.notification.is_none());
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let (db, notifier) = setup();
        let service = OrderService::new(db.as_ref(), ShippingPolicy::default(), &notifier);
        let err = service
            .update_status(OrderId::generate(), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }
}
