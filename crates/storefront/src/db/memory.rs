//! In-process implementation of the repository traits.
//!
//! Used by `herbwell-storefront` when no database URL is configured and by
//! the test suites. Every table can be switched offline with
//! [`MemoryDatabase::set_unavailable`] to exercise failure paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use herbwell_core::{
    AddressId, BundleId, Category, EmailLogId, OrderId, OrderItemId, OrderStatus, PaymentStatus,
    ProductId, Rating, ReviewId, UserId,
};

use super::{
    BundleRepository, CatalogRepository, Database, EmailLogRepository, OrderRepository,
    ProfileRepository, RepositoryError, ReviewRepository, UserOrderStats,
};
use crate::models::{
    Address, Bundle, BundleInput, EmailLogEntry, NewAddress, NewEmailLog, NewOrder, NewOrderItem,
    NewReview, Order, OrderItem, Product, Profile, Review,
};

/// Table names accepted by [`MemoryDatabase::set_unavailable`] besides the
/// category tables.
pub mod tables {
    pub const PRODUCTS: &str = "products";
    pub const BUNDLES: &str = "bundles";
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
    pub const ADDRESSES: &str = "addresses";
    pub const REVIEWS: &str = "reviews";
    pub const PROFILES: &str = "profiles";
    pub const EMAILS: &str = "emails";
}

#[derive(Default)]
struct Tables {
    products: HashMap<Category, Vec<Product>>,
    legacy_products: HashMap<ProductId, String>,
    bundles: Vec<Bundle>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    addresses: Vec<Address>,
    reviews: Vec<Review>,
    profiles: Vec<Profile>,
    emails: Vec<EmailLogEntry>,
}

/// Repository backed by in-memory tables.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
    offline: RwLock<HashSet<String>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every access to `table` fail with `RepositoryError::Unavailable`.
    pub async fn set_unavailable(&self, table: &str, unavailable: bool) {
        let mut offline = self.offline.write().await;
        if unavailable {
            offline.insert(table.to_owned());
        } else {
            offline.remove(table);
        }
    }

    async fn check(&self, table: &str) -> Result<(), RepositoryError> {
        if self.offline.read().await.contains(table) {
            return Err(RepositoryError::Unavailable(format!("{table} is offline")));
        }
        Ok(())
    }

    /// Add a product to its category table.
    pub async fn insert_product(&self, product: Product) {
        self.tables
            .write()
            .await
            .products
            .entry(product.category())
            .or_default()
            .push(product);
    }

    /// Add a row to the legacy `products` table.
    pub async fn insert_legacy_product(&self, id: ProductId, title: impl Into<String>) {
        self.tables
            .write()
            .await
            .legacy_products
            .insert(id, title.into());
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.tables.write().await.profiles.push(profile);
    }

    /// Every audit row, oldest first.
    pub async fn emails(&self) -> Vec<EmailLogEntry> {
        self.tables.read().await.emails.clone()
    }
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

#[async_trait]
impl CatalogRepository for MemoryDatabase {
    async fn list_products(&self, category: Category) -> Result<Vec<Product>, RepositoryError> {
        self.check(category.table_name()).await?;
        let mut products = self
            .tables
            .read()
            .await
            .products
            .get(&category)
            .cloned()
            .unwrap_or_default();
        newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }

    async fn get_product_by_slug(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check(category.table_name()).await?;
        Ok(self
            .tables
            .read()
            .await
            .products
            .get(&category)
            .and_then(|rows| rows.iter().find(|p| p.slug == slug).cloned()))
    }

    async fn get_product_by_id(
        &self,
        category: Category,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check(category.table_name()).await?;
        Ok(self
            .tables
            .read()
            .await
            .products
            .get(&category)
            .and_then(|rows| rows.iter().find(|p| p.id == id).cloned()))
    }

    async fn list_related_products(
        &self,
        product: &Product,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let wanted = product.details.shared_attribute();
        let mut related: Vec<Product> = self
            .list_products(product.category())
            .await?
            .into_iter()
            .filter(|p| p.slug != product.slug)
            .collect();
        // stable sort keeps newest-first inside each group
        related.sort_by_key(|p| !(wanted.is_some() && p.details.shared_attribute() == wanted));
        related.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(related)
    }

    async fn get_legacy_product_name(
        &self,
        id: ProductId,
    ) -> Result<Option<String>, RepositoryError> {
        self.check(tables::PRODUCTS).await?;
        Ok(self.tables.read().await.legacy_products.get(&id).cloned())
    }
}

#[async_trait]
impl BundleRepository for MemoryDatabase {
    async fn list_bundles(&self, active_only: bool) -> Result<Vec<Bundle>, RepositoryError> {
        self.check(tables::BUNDLES).await?;
        let mut bundles: Vec<Bundle> = self
            .tables
            .read()
            .await
            .bundles
            .iter()
            .filter(|b| !active_only || b.is_active)
            .cloned()
            .collect();
        newest_first(&mut bundles, |b| b.created_at);
        Ok(bundles)
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Option<Bundle>, RepositoryError> {
        self.check(tables::BUNDLES).await?;
        Ok(self
            .tables
            .read()
            .await
            .bundles
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn get_bundle_by_slug(&self, slug: &str) -> Result<Option<Bundle>, RepositoryError> {
        self.check(tables::BUNDLES).await?;
        Ok(self
            .tables
            .read()
            .await
            .bundles
            .iter()
            .find(|b| b.slug == slug)
            .cloned())
    }

    async fn create_bundle(&self, input: BundleInput) -> Result<Bundle, RepositoryError> {
        self.check(tables::BUNDLES).await?;
        let mut tables = self.tables.write().await;
        let bundle = input.into_bundle(BundleId::generate(), Utc::now());
        if tables.bundles.iter().any(|b| b.slug == bundle.slug) {
            return Err(RepositoryError::Conflict("bundle slug already exists".to_owned()));
        }
        tables.bundles.push(bundle.clone());
        Ok(bundle)
    }

    async fn update_bundle(
        &self,
        id: BundleId,
        input: BundleInput,
    ) -> Result<Option<Bundle>, RepositoryError> {
        self.check(tables::BUNDLES).await?;
        let mut tables = self.tables.write().await;
        if tables
            .bundles
            .iter()
            .any(|b| b.id != id && b.slug == input.slug.trim())
        {
            return Err(RepositoryError::Conflict("bundle slug already exists".to_owned()));
        }
        let Some(existing) = tables.bundles.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        let mut updated = input.into_bundle(id, existing.created_at);
        updated.updated_at = Utc::now();
        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_bundle(&self, id: BundleId) -> Result<bool, RepositoryError> {
        self.check(tables::BUNDLES).await?;
        let mut tables = self.tables.write().await;
        let before = tables.bundles.len();
        tables.bundles.retain(|b| b.id != id);
        Ok(tables.bundles.len() != before)
    }
}

#[async_trait]
impl OrderRepository for MemoryDatabase {
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        self.check(tables::ADDRESSES).await?;
        Ok(self
            .tables
            .read()
            .await
            .addresses
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn insert_address(&self, address: NewAddress) -> Result<Address, RepositoryError> {
        self.check(tables::ADDRESSES).await?;
        let address = address.into_address(AddressId::generate(), Utc::now());
        self.tables.write().await.addresses.push(address.clone());
        Ok(address)
    }

    async fn insert_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        self.check(tables::ORDERS).await?;
        self.check(tables::ORDER_ITEMS).await?;

        let order = order.into_order();
        let items: Vec<OrderItem> = items
            .into_iter()
            .map(|item| item.into_item(OrderItemId::generate(), order.id))
            .collect();

        let mut tables = self.tables.write().await;
        tables.orders.push(order.clone());
        tables.order_items.extend(items.iter().cloned());
        Ok((order, items))
    }

    async fn mark_order_paid(
        &self,
        id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order, RepositoryError> {
        self.check(tables::ORDERS).await?;
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.payment_status = PaymentStatus::Paid;
        order.payment_intent_id = Some(payment_intent_id.to_owned());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check(tables::ORDERS).await?;
        Ok(self
            .tables
            .read()
            .await
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        self.check(tables::ORDERS).await?;
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.payment_status = payment_status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        self.check(tables::ORDERS).await?;
        let mut orders = self.tables.read().await.orders.clone();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn list_order_items(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        self.check(tables::ORDER_ITEMS).await?;
        Ok(self
            .tables
            .read()
            .await
            .order_items
            .iter()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect())
    }

    async fn list_addresses(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
        self.check(tables::ADDRESSES).await?;
        Ok(self
            .tables
            .read()
            .await
            .addresses
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn list_user_order_stats(&self) -> Result<Vec<UserOrderStats>, RepositoryError> {
        self.check(tables::ORDERS).await?;
        let tables = self.tables.read().await;
        let mut stats: HashMap<UserId, UserOrderStats> = HashMap::new();
        for order in &tables.orders {
            let Some(user_id) = order.user_id else {
                continue;
            };
            let entry = stats.entry(user_id).or_insert(UserOrderStats {
                user_id,
                order_count: 0,
                total_spent: rust_decimal::Decimal::ZERO,
            });
            entry.order_count += 1;
            entry.total_spent += order.total;
        }
        Ok(stats.into_values().collect())
    }
}

#[async_trait]
impl ReviewRepository for MemoryDatabase {
    async fn list_reviews_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        self.check(tables::REVIEWS).await?;
        let mut reviews: Vec<Review> = self
            .tables
            .read()
            .await
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        newest_first(&mut reviews, |r| r.created_at);
        Ok(reviews)
    }

    async fn list_ratings_for_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, Rating)>, RepositoryError> {
        self.check(tables::REVIEWS).await?;
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .iter()
            .filter(|r| product_ids.contains(&r.product_id))
            .map(|r| (r.product_id, r.rating))
            .collect())
    }

    async fn find_review(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        self.check(tables::REVIEWS).await?;
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .iter()
            .find(|r| r.user_id == user_id && r.product_id == product_id)
            .cloned())
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        self.check(tables::REVIEWS).await?;
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .iter()
            .any(|r| r.user_id == review.user_id && r.product_id == review.product_id)
        {
            return Err(RepositoryError::Conflict(
                "user already reviewed this product".to_owned(),
            ));
        }
        let review = review.into_review(ReviewId::generate(), Utc::now());
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        self.check(tables::REVIEWS).await?;
        let mut reviews = self.tables.read().await.reviews.clone();
        newest_first(&mut reviews, |r| r.created_at);
        Ok(reviews)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        self.check(tables::REVIEWS).await?;
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() != before)
    }
}

#[async_trait]
impl ProfileRepository for MemoryDatabase {
    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        self.check(tables::PROFILES).await?;
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        self.check(tables::PROFILES).await?;
        let mut profiles = self.tables.read().await.profiles.clone();
        newest_first(&mut profiles, |p| p.created_at);
        Ok(profiles)
    }

    async fn get_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>, RepositoryError> {
        self.check(tables::PROFILES).await?;
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EmailLogRepository for MemoryDatabase {
    async fn record_email(&self, entry: NewEmailLog) -> Result<EmailLogEntry, RepositoryError> {
        self.check(tables::EMAILS).await?;
        let row = EmailLogEntry {
            id: EmailLogId::generate(),
            order_id: entry.order_id,
            recipient: entry.recipient,
            subject: entry.subject,
            kind: entry.kind,
            status: entry.status,
            error: entry.error,
            created_at: Utc::now(),
        };
        self.tables.write().await.emails.push(row.clone());
        Ok(row)
    }

    async fn list_emails_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<EmailLogEntry>, RepositoryError> {
        self.check(tables::EMAILS).await?;
        Ok(self
            .tables
            .read()
            .await
            .emails
            .iter()
            .filter(|e| e.order_id == Some(order_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::product::tests::sample_product;
    use crate::models::product::{ProductDetails, SoapDetails};

    fn soap(title: &str, skin_type: Option<&str>, age_days: i64) -> Product {
        let mut product = sample_product(Category::Soaps, title, 10_00);
        product.details = ProductDetails::Soaps(SoapDetails {
            skin_type: skin_type.map(str::to_owned),
            ..SoapDetails::default()
        });
        product.created_at = Utc::now() - Duration::days(age_days);
        product
    }

    #[tokio::test]
    async fn test_related_prefers_shared_attribute_then_newest() {
        let db = MemoryDatabase::new();
        let current = soap("Oat", Some("dry"), 5);
        db.insert_product(current.clone()).await;
        db.insert_product(soap("Charcoal", Some("oily"), 0)).await;
        db.insert_product(soap("Honey", Some("dry"), 3)).await;
        db.insert_product(soap("Shea", Some("dry"), 1)).await;

        let related = db.list_related_products(&current, 10).await.unwrap();
        let titles: Vec<_> = related.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Shea", "Honey", "Charcoal"]);

        let limited = db.list_related_products(&current, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_table_fails() {
        let db = MemoryDatabase::new();
        db.set_unavailable("lotions", true).await;
        let err = db.list_products(Category::Lotions).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));
        assert!(db.list_products(Category::Soaps).await.is_ok());

        db.set_unavailable("lotions", false).await;
        assert!(db.list_products(Category::Lotions).await.is_ok());
    }

    #[tokio::test]
    async fn test_insert_order_writes_nothing_when_items_table_offline() {
        let db = MemoryDatabase::new();
        db.set_unavailable(tables::ORDER_ITEMS, true).await;
        let order = NewOrder {
            id: OrderId::generate(),
            order_number: "HW-20240101-AAAAAA".to_owned(),
            user_id: None,
            shipping_address_id: None,
            subtotal: Decimal::new(10_00, 2),
            shipping_cost: Decimal::new(4_99, 2),
            total: Decimal::new(14_99, 2),
            payment_method: herbwell_core::PaymentMethod::CashOnDelivery,
            notes: None,
            created_at: Utc::now(),
        };
        assert!(db.insert_order(order, Vec::new()).await.is_err());
        assert!(db.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_review_conflicts() {
        let db = MemoryDatabase::new();
        let review = NewReview {
            user_id: UserId::generate(),
            product_id: ProductId::generate(),
            product_category: None,
            rating: Rating::new(4).unwrap(),
            comment: None,
        };
        db.insert_review(review.clone()).await.unwrap();
        let err = db.insert_review(review).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_bundle_slug_is_unique() {
        let db = MemoryDatabase::new();
        let input = BundleInput {
            name: "Set".to_owned(),
            slug: "set".to_owned(),
            description: None,
            price: Decimal::new(20_00, 2),
            original_price: None,
            image_url: None,
            items: Vec::new(),
            is_active: true,
            is_featured: false,
            is_bestseller: false,
        };
        let first = db.create_bundle(input.clone()).await.unwrap();
        assert!(matches!(
            db.create_bundle(input.clone()).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert!(db.update_bundle(first.id, input).await.unwrap().is_some());
        assert!(db.delete_bundle(first.id).await.unwrap());
        assert!(!db.delete_bundle(first.id).await.unwrap());
    }
}
