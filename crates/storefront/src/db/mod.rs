//! Persistence for the storefront.
//!
//! # Tables
//!
//! - `soaps`, `herbal_teas`, `lotions`, `oils`, `beard_care`, `shampoos`,
//!   `roll_ons`, `elixirs` - one catalog table per category
//! - `products` - legacy catalog, only consulted for review product names
//! - `bundles` - product bundles
//! - `orders`, `order_items`, `addresses` - checkout
//! - `profiles` - account display data
//! - `reviews` - one review per (user, product)
//! - `emails` - audit log of notification attempts
//! - `tower_sessions.session` - cart and wishlist sessions
//!
//! Access goes through the repository traits below. [`PgDatabase`] is the
//! production implementation; [`MemoryDatabase`] backs local development and
//! the test suites.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p herbwell-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use herbwell_core::{
    AddressId, BundleId, Category, OrderId, OrderStatus, PaymentStatus, ProductId, Rating,
    ReviewId, UserId,
};

use crate::models::{
    Address, Bundle, BundleInput, EmailLogEntry, NewAddress, NewEmailLog, NewOrder, NewOrderItem,
    NewReview, Order, OrderItem, Product, Profile, Review,
};

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate review).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Order count and lifetime spend of one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserOrderStats {
    pub user_id: UserId,
    pub order_count: u32,
    pub total_spent: Decimal,
}

/// Per-category product tables plus the legacy `products` table.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Every product in one category, newest first.
    async fn list_products(&self, category: Category) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product_by_slug(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError>;

    async fn get_product_by_id(
        &self,
        category: Category,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Products from the same category as `product`, excluding it. Products
    /// sharing its shared attribute come first, then newest first.
    async fn list_related_products(
        &self,
        product: &Product,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Title of a product in the legacy single-table catalog.
    async fn get_legacy_product_name(
        &self,
        id: ProductId,
    ) -> Result<Option<String>, RepositoryError>;
}

#[async_trait]
pub trait BundleRepository: Send + Sync {
    /// Bundles, newest first. `active_only` hides deactivated bundles.
    async fn list_bundles(&self, active_only: bool) -> Result<Vec<Bundle>, RepositoryError>;

    async fn get_bundle(&self, id: BundleId) -> Result<Option<Bundle>, RepositoryError>;

    async fn get_bundle_by_slug(&self, slug: &str) -> Result<Option<Bundle>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    async fn create_bundle(&self, input: BundleInput) -> Result<Bundle, RepositoryError>;

    /// Replace a bundle's fields. `None` when the bundle does not exist.
    async fn update_bundle(
        &self,
        id: BundleId,
        input: BundleInput,
    ) -> Result<Option<Bundle>, RepositoryError>;

    /// Returns whether a bundle was deleted.
    async fn delete_bundle(&self, id: BundleId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    async fn insert_address(&self, address: NewAddress) -> Result<Address, RepositoryError>;

    /// Insert an order and its line items. Either all rows are written or none.
    async fn insert_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError>;

    /// Record a captured online payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    async fn mark_order_paid(
        &self,
        id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Persist a new fulfillment status together with its payment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError>;

    /// Every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Line items of the given orders, in insertion order.
    async fn list_order_items(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<OrderItem>, RepositoryError>;

    async fn list_addresses(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError>;

    /// Order count and spend per customer that has placed an order.
    async fn list_user_order_stats(&self) -> Result<Vec<UserOrderStats>, RepositoryError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Reviews of one product, newest first.
    async fn list_reviews_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError>;

    /// `(product, rating)` pairs for every review of the given products.
    async fn list_ratings_for_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, Rating)>, RepositoryError>;

    async fn find_review(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    async fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError>;

    /// Every review, newest first.
    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError>;

    /// Returns whether a review was deleted.
    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Every profile, newest first.
    async fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError>;

    async fn get_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>, RepositoryError>;
}

#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    async fn record_email(&self, entry: NewEmailLog) -> Result<EmailLogEntry, RepositoryError>;

    async fn list_emails_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<EmailLogEntry>, RepositoryError>;
}

/// Everything the storefront needs from its backing store.
#[async_trait]
pub trait Database:
    CatalogRepository
    + BundleRepository
    + OrderRepository
    + ReviewRepository
    + ProfileRepository
    + EmailLogRepository
{
    /// Cheap connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}
