//! Admin listings and bundle management.
//!
//! Listings load their related rows in batches (one query per related table)
//! and join them in memory.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use herbwell_core::{AddressId, BundleId, Category, OrderId, ReviewId, UserId};

use super::catalog::{CatalogService, CategoryCache};
use super::reviews::{ReviewError, ReviewService};
use crate::db::{Database, RepositoryError};
use crate::models::{Address, Bundle, BundleInput, Order, OrderItem, Profile, ReviewWithAuthor};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AdminError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

impl From<ReviewError> for AdminError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Validation(msg) => Self::Validation(msg),
            ReviewError::Duplicate => Self::Conflict(err.to_string()),
            ReviewError::Repository(e) => Self::Repository(e),
        }
    }
}

/// An order with everything the admin order table shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderView {
    #[serde(flatten)]
    pub order: Order,
    pub shipping_address: Option<Address>,
    pub items: Vec<OrderItem>,
    pub customer: Option<Profile>,
}

/// A customer with order statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    #[serde(flatten)]
    pub profile: Profile,
    pub order_count: u32,
    pub total_spent: Decimal,
}

/// A review with the product it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReviewView {
    #[serde(flatten)]
    pub review: ReviewWithAuthor,
    pub product_name: String,
    pub resolved_category: Option<Category>,
    pub product_slug: Option<String>,
}

pub struct AdminService<'a> {
    db: &'a dyn Database,
    cache: &'a CategoryCache,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database, cache: &'a CategoryCache) -> Self {
        Self { db, cache }
    }

    /// Every order, newest first, with address, items and customer.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the underlying tables cannot be read.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<AdminOrderView>, AdminError> {
        let orders = self.db.list_orders().await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let address_ids: Vec<AddressId> = unique(orders.iter().filter_map(|o| o.shipping_address_id));
        let user_ids: Vec<UserId> = unique(orders.iter().filter_map(|o| o.user_id));

        let (items, addresses, profiles) = tokio::try_join!(
            self.db.list_order_items(&order_ids),
            self.db.list_addresses(&address_ids),
            self.db.get_profiles(&user_ids),
        )?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
        let addresses: HashMap<AddressId, Address> =
            addresses.into_iter().map(|a| (a.id, a)).collect();
        let profiles: HashMap<UserId, Profile> = profiles.into_iter().map(|p| (p.id, p)).collect();

        Ok(orders
            .into_iter()
            .map(|order| AdminOrderView {
                shipping_address: order
                    .shipping_address_id
                    .and_then(|id| addresses.get(&id).cloned()),
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                customer: order.user_id.and_then(|id| profiles.get(&id).cloned()),
                order,
            })
            .collect())
    }

    /// Every profile with its order count and lifetime spend.
    ///
    /// # Errors
    ///
    /// Returns an error if profiles or orders cannot be read.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<AdminUserView>, AdminError> {
        let (profiles, stats) =
            tokio::try_join!(self.db.list_profiles(), self.db.list_user_order_stats())?;
        let stats: HashMap<UserId, (u32, Decimal)> = stats
            .into_iter()
            .map(|s| (s.user_id, (s.order_count, s.total_spent)))
            .collect();

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let (order_count, total_spent) =
                    stats.get(&profile.id).copied().unwrap_or((0, Decimal::ZERO));
                AdminUserView {
                    profile,
                    order_count,
                    total_spent,
                }
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the bundles table cannot be read.
    pub async fn list_bundles(&self) -> Result<Vec<Bundle>, AdminError> {
        Ok(self.db.list_bundles(false).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` when the bundle does not exist.
    pub async fn get_bundle(&self, id: BundleId) -> Result<Bundle, AdminError> {
        self.db
            .get_bundle(id)
            .await?
            .ok_or(AdminError::NotFound("bundle"))
    }

    /// # Errors
    ///
    /// Returns `AdminError::Validation` for invalid input and
    /// `AdminError::Conflict` when the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_bundle(&self, input: BundleInput) -> Result<Bundle, AdminError> {
        input.validate().map_err(AdminError::Validation)?;
        let bundle = self.db.create_bundle(input).await?;
        info!(bundle_id = %bundle.id, "Bundle created");
        Ok(bundle)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Validation` for invalid input and
    /// `AdminError::NotFound` when the bundle does not exist.
    #[instrument(skip(self, input), fields(bundle_id = %id))]
    pub async fn update_bundle(&self, id: BundleId, input: BundleInput) -> Result<Bundle, AdminError> {
        input.validate().map_err(AdminError::Validation)?;
        let bundle = self
            .db
            .update_bundle(id, input)
            .await?
            .ok_or(AdminError::NotFound("bundle"))?;
        info!("Bundle updated");
        Ok(bundle)
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` when the bundle does not exist.
    #[instrument(skip(self), fields(bundle_id = %id))]
    pub async fn delete_bundle(&self, id: BundleId) -> Result<(), AdminError> {
        if !self.db.delete_bundle(id).await? {
            return Err(AdminError::NotFound("bundle"));
        }
        info!("Bundle deleted");
        Ok(())
    }

    /// Every review, newest first, with author and resolved product.
    ///
    /// # Errors
    ///
    /// Returns an error if reviews or profiles cannot be read. Product
    /// resolution never fails.
    #[instrument(skip(self))]
    pub async fn list_reviews(&self) -> Result<Vec<AdminReviewView>, AdminError> {
        let reviews = self.db.list_reviews().await?;
        let reviews = ReviewService::new(self.db).with_authors(reviews).await?;
        let catalog = CatalogService::new(self.db, self.cache);

        let mut views = Vec::with_capacity(reviews.len());
        for review in reviews {
            let product = catalog
                .resolve_product(review.review.product_id, review.review.product_category)
                .await;
            views.push(AdminReviewView {
                review,
                product_name: product.name,
                resolved_category: product.category,
                product_slug: product.slug,
            });
        }
        Ok(views)
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` when the review does not exist.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), AdminError> {
        if !self.db.delete_review(id).await? {
            return Err(AdminError::NotFound("review"));
        }
        info!("Review deleted");
        Ok(())
    }
}

fn unique<T: Ord>(ids: impl Iterator<Item = T>) -> Vec<T> {
    let mut ids: Vec<T> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
