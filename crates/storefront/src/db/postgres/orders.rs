//! Orders, order items and addresses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use herbwell_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId, raw_uuids,
};

use super::{PgDatabase, parse_column, quantity_column};
use crate::db::{OrderRepository, RepositoryError, UserOrderStats};
use crate::models::{Address, NewAddress, NewOrder, NewOrderItem, Order, OrderItem};

const ORDER_COLUMNS: &str = "id, order_number, user_id, shipping_address_id, subtotal, \
     shipping_cost, total, status, payment_method, payment_status, payment_intent_id, notes, \
     created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, product_category, quantity, price";

const ADDRESS_COLUMNS: &str = "id, user_id, full_name, email, phone, line1, line2, city, state, \
     postal_code, country, is_default, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<UserId>,
    shipping_address_id: Option<AddressId>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    status: String,
    payment_method: String,
    payment_status: String,
    payment_intent_id: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            shipping_address_id: row.shipping_address_id,
            subtotal: row.subtotal,
            shipping_cost: row.shipping_cost,
            total: row.total,
            status: parse_column("order status", &row.status)?,
            payment_method: parse_column("payment method", &row.payment_method)?,
            payment_status: parse_column("payment status", &row.payment_status)?,
            payment_intent_id: row.payment_intent_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    product_name: String,
    product_category: Option<String>,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_category: row
                .product_category
                .as_deref()
                .map(|c| parse_column("product category", c))
                .transpose()?,
            quantity: quantity_column(row.quantity)?,
            price: row.price,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: Option<UserId>,
    full_name: String,
    email: Option<String>,
    phone: Option<String>,
    line1: String,
    line2: Option<String>,
    city: String,
    state: Option<String>,
    postal_code: String,
    country: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            line1: row.line1,
            line2: row.line2,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserStatsRow {
    user_id: UserId,
    order_count: i64,
    total_spent: Decimal,
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is too large")))
}

#[async_trait]
impl OrderRepository for PgDatabase {
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1");
        let row: Option<AddressRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Address::from))
    }

    async fn insert_address(&self, address: NewAddress) -> Result<Address, RepositoryError> {
        let sql = format!(
            "INSERT INTO addresses (id, user_id, full_name, email, phone, line1, line2, city, \
                state, postal_code, country, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {ADDRESS_COLUMNS}"
        );
        let row: AddressRow = sqlx::query_as(&sql)
            .bind(AddressId::generate())
            .bind(address.user_id)
            .bind(&address.full_name)
            .bind(&address.email)
            .bind(&address.phone)
            .bind(&address.line1)
            .bind(&address.line2)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.postal_code)
            .bind(&address.country)
            .bind(address.is_default)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn insert_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO orders (id, order_number, user_id, shipping_address_id, subtotal, \
                shipping_cost, total, status, payment_method, payment_status, notes, \
                created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(order.user_id)
            .bind(order.shipping_address_id)
            .bind(order.subtotal)
            .bind(order.shipping_cost)
            .bind(order.total)
            .bind(OrderStatus::Pending.as_str())
            .bind(order.payment_method.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .bind(&order.notes)
            .bind(order.created_at)
            .fetch_one(&mut *tx)
            .await?;
        let stored = Order::try_from(row)?;

        let item_sql = format!(
            "INSERT INTO order_items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ITEM_COLUMNS}"
        );
        let mut stored_items = Vec::with_capacity(items.len());
        for item in items {
            let row: OrderItemRow = sqlx::query_as(&item_sql)
                .bind(OrderItemId::generate())
                .bind(stored.id)
                .bind(item.product_id)
                .bind(&item.product_name)
                .bind(item.product_category.map(|c| c.table_name()))
                .bind(quantity_param(item.quantity)?)
                .bind(item.price)
                .fetch_one(&mut *tx)
                .await?;
            stored_items.push(OrderItem::try_from(row)?);
        }

        tx.commit().await?;
        Ok((stored, stored_items))
    }

    async fn mark_order_paid(
        &self,
        id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE orders SET payment_status = $2, payment_intent_id = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(PaymentStatus::Paid.as_str())
            .bind(payment_intent_id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE orders SET status = $2, payment_status = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(payment_status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_order_items(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY created_at"
        );
        let rows: Vec<OrderItemRow> = sqlx::query_as(&sql)
            .bind(raw_uuids(order_ids))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn list_addresses(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ANY($1)");
        let rows: Vec<AddressRow> = sqlx::query_as(&sql)
            .bind(raw_uuids(ids))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn list_user_order_stats(&self) -> Result<Vec<UserOrderStats>, RepositoryError> {
        let rows: Vec<UserStatsRow> = sqlx::query_as(
            "SELECT user_id, COUNT(*) AS order_count, COALESCE(SUM(total), 0) AS total_spent \
             FROM orders WHERE user_id IS NOT NULL GROUP BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(UserOrderStats {
                    user_id: row.user_id,
                    order_count: u32::try_from(row.order_count).map_err(|_| {
                        RepositoryError::DataCorruption(format!(
                            "order count out of range: {}",
                            row.order_count
                        ))
                    })?,
                    total_spent: row.total_spent,
                })
            })
            .collect()
    }
}
