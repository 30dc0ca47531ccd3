//! Orders and their line items.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use herbwell_core::{
    AddressId, Category, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, UserId, line_total,
};

/// Prefix shared by order numbers and tracking references.
pub const ORDER_NUMBER_PREFIX: &str = "HW";

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub shipping_address_id: Option<AddressId>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of one purchased product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_category: Option<Category>,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        line_total(self.price, self.quantity)
    }
}

/// An order ready to be inserted. Status and payment status start as pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub shipping_address_id: Option<AddressId>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// The row as stored, before any payment reconciliation.
    #[must_use]
    pub fn into_order(self) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            shipping_address_id: self.shipping_address_id,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            total: self.total,
            status: OrderStatus::Pending,
            payment_method: self.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: None,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// A line item ready to be inserted alongside its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_category: Option<Category>,
    pub quantity: u32,
    pub price: Decimal,
}

impl NewOrderItem {
    #[must_use]
    pub fn into_item(self, id: OrderItemId, order_id: OrderId) -> OrderItem {
        OrderItem {
            id,
            order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            product_category: self.product_category,
            quantity: self.quantity,
            price: self.price,
        }
    }
}

/// Generate an order number like `HW-20240315-7KQ2ZD`.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{ORDER_NUMBER_PREFIX}-{}-{suffix}", now.format("%Y%m%d"))
}

/// Synthesize a carrier tracking reference for a shipped order.
///
/// `HW` + the digits of the order number + four random digits.
#[must_use]
pub fn tracking_reference(order_number: &str) -> String {
    let digits: String = order_number.chars().filter(char::is_ascii_digit).collect();
    let suffix: u16 = rand::rng().random_range(0..10_000);
    format!("{ORDER_NUMBER_PREFIX}{digits}{suffix:04}")
}
