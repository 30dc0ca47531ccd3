//! Product bundles.
//!
//! A bundle groups products from any category and is sold as one unit at its
//! own price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use herbwell_core::{BundleId, Category, ProductId};

/// One product inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleItem {
    pub product_id: ProductId,
    pub category: Category,
    pub quantity: u32,
}

/// A stored bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: BundleId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub items: Vec<BundleItem>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_bestseller: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-supplied bundle fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub items: Vec<BundleItem>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_bestseller: bool,
}

const fn default_active() -> bool {
    true
}

impl BundleInput {
    /// Check the fields an admin can get wrong.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("bundle name is required".to_owned());
        }
        if self.slug.trim().is_empty() {
            return Err("bundle slug is required".to_owned());
        }
        if self.price.is_sign_negative() {
            return Err("bundle price cannot be negative".to_owned());
        }
        if self.original_price.is_some_and(|p| p.is_sign_negative()) {
            return Err("original price cannot be negative".to_owned());
        }
        if self.items.is_empty() {
            return Err("a bundle needs at least one product".to_owned());
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err("bundle item quantity must be at least 1".to_owned());
        }
        Ok(())
    }

    /// Build a stored bundle from validated input.
    #[must_use]
    pub fn into_bundle(self, id: BundleId, created_at: DateTime<Utc>) -> Bundle {
        Bundle {
            id,
            name: self.name.trim().to_owned(),
            slug: self.slug.trim().to_owned(),
            description: self.description,
            price: self.price,
            original_price: self.original_price,
            image_url: self.image_url,
            items: self.items,
            is_active: self.is_active,
            is_featured: self.is_featured,
            is_bestseller: self.is_bestseller,
            created_at,
            updated_at: created_at,
        }
    }
}
