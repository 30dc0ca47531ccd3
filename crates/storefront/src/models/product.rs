//! Catalog products.
//!
//! Every category shares the same base fields; what differs lives in
//! [`ProductDetails`], whose serde tag doubles as the `category` label on
//! every product the API returns. In `PostgreSQL` the per-category payload is
//! the `attributes` JSONB column of that category's table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use herbwell_core::cart::{CartItem, WishlistItem};
use herbwell_core::{Category, ProductId};

/// A catalog product from any category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ProductDetails,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// The category (and therefore table) this product belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.details.category()
    }

    /// Whether the product carries `badge` (case-insensitive).
    #[must_use]
    pub fn has_badge(&self, badge: &str) -> bool {
        let badge = badge.trim();
        self.badges.iter().any(|b| b.trim().eq_ignore_ascii_case(badge))
    }

    /// Snapshot this product as a cart line.
    #[must_use]
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            product_id: self.id,
            title: self.title.clone(),
            image: self.image_url.clone(),
            price: self.price,
            category: self.category(),
            slug: self.slug.clone(),
            quantity,
            in_stock: self.in_stock,
        }
    }

    /// Snapshot this product as a wishlist entry.
    #[must_use]
    pub fn to_wishlist_item(&self) -> WishlistItem {
        WishlistItem {
            product_id: self.id,
            title: self.title.clone(),
            image: self.image_url.clone(),
            price: self.price,
            category: self.category(),
            slug: self.slug.clone(),
            in_stock: self.in_stock,
        }
    }
}

/// Category-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ProductDetails {
    Soaps(SoapDetails),
    HerbalTeas(TeaDetails),
    Lotions(LotionDetails),
    Oils(OilDetails),
    BeardCare(BeardCareDetails),
    Shampoos(ShampooDetails),
    RollOns(RollOnDetails),
    Elixirs(ElixirDetails),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoapDetails {
    pub skin_type: Option<String>,
    pub scent: Option<String>,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeaDetails {
    pub caffeine_level: Option<String>,
    pub flavor: Option<String>,
    pub brewing_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LotionDetails {
    pub skin_type: Option<String>,
    pub scent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OilDetails {
    pub oil_type: Option<String>,
    pub usage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeardCareDetails {
    pub product_type: Option<String>,
    pub scent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShampooDetails {
    pub hair_type: Option<String>,
    pub scent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollOnDetails {
    pub purpose: Option<String>,
    pub scent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElixirDetails {
    pub purpose: Option<String>,
    pub volume_ml: Option<i32>,
}

impl ProductDetails {
    /// Empty attributes for a category.
    #[must_use]
    pub fn empty(category: Category) -> Self {
        match category {
            Category::Soaps => Self::Soaps(SoapDetails::default()),
            Category::HerbalTeas => Self::HerbalTeas(TeaDetails::default()),
            Category::Lotions => Self::Lotions(LotionDetails::default()),
            Category::Oils => Self::Oils(OilDetails::default()),
            Category::BeardCare => Self::BeardCare(BeardCareDetails::default()),
            Category::Shampoos => Self::Shampoos(ShampooDetails::default()),
            Category::RollOns => Self::RollOns(RollOnDetails::default()),
            Category::Elixirs => Self::Elixirs(ElixirDetails::default()),
        }
    }

    /// The category discriminant.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Soaps(_) => Category::Soaps,
            Self::HerbalTeas(_) => Category::HerbalTeas,
            Self::Lotions(_) => Category::Lotions,
            Self::Oils(_) => Category::Oils,
            Self::BeardCare(_) => Category::BeardCare,
            Self::Shampoos(_) => Category::Shampoos,
            Self::RollOns(_) => Category::RollOns,
            Self::Elixirs(_) => Category::Elixirs,
        }
    }

    /// The attribute related products are matched on.
    #[must_use]
    pub fn shared_attribute(&self) -> Option<&str> {
        match self {
            Self::Soaps(d) => d.skin_type.as_deref(),
            Self::HerbalTeas(d) => d.caffeine_level.as_deref(),
            Self::Lotions(d) => d.skin_type.as_deref(),
            Self::Oils(d) => d.oil_type.as_deref(),
            Self::BeardCare(d) => d.product_type.as_deref(),
            Self::Shampoos(d) => d.hair_type.as_deref(),
            Self::RollOns(d) => d.purpose.as_deref(),
            Self::Elixirs(d) => d.purpose.as_deref(),
        }
    }

    /// JSON key of [`Self::shared_attribute`] inside the `attributes` column.
    #[must_use]
    pub const fn shared_attribute_key(&self) -> &'static str {
        match self {
            Self::Soaps(_) | Self::Lotions(_) => "skinType",
            Self::HerbalTeas(_) => "caffeineLevel",
            Self::Oils(_) => "oilType",
            Self::BeardCare(_) => "productType",
            Self::Shampoos(_) => "hairType",
            Self::RollOns(_) | Self::Elixirs(_) => "purpose",
        }
    }

    /// Decode the `attributes` JSONB column of a category table.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is not an object or a field has the
    /// wrong type.
    pub fn from_attributes(category: Category, attributes: Value) -> Result<Self, serde_json::Error> {
        let mut object = match attributes {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "attributes must be an object, got {other}"
                )));
            }
        };
        object.insert(
            "category".to_owned(),
            Value::String(category.table_name().to_owned()),
        );
        serde_json::from_value(Value::Object(object))
    }

    /// Encode for the `attributes` JSONB column (without the category tag).
    #[must_use]
    pub fn to_attributes(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("category");
                Value::Object(map)
            }
            _ => Value::Object(Map::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build a product for tests.
    pub fn sample_product(category: Category, title: &str, cents: i64) -> Product {
        Product {
            id: ProductId::generate(),
            title: title.to_owned(),
            slug: title.to_lowercase().replace(' ', "-"),
            description: None,
            price: Decimal::new(cents, 2),
            image_url: None,
            stock_quantity: 10,
            in_stock: true,
            tags: Vec::new(),
            badges: Vec::new(),
            created_at: Utc::now(),
            details: ProductDetails::empty(category),
        }
    }

    #[test]
    fn test_serializes_category_tag() {
        let product = sample_product(Category::Soaps, "Lavender Bar", 12_00);
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["category"], "soaps");
        assert_eq!(json["title"], "Lavender Bar");
    }

    #[test]
    fn test_deserializes_with_category_payload() {
        let json = serde_json::json!({
            "id": "6f1c2f43-43a3-4a9e-9d5c-0f0c1f2d3e4a",
            "title": "Morning Chai",
            "slug": "morning-chai",
            "price": "9.50",
            "category": "herbal_teas",
            "caffeineLevel": "high"
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.category(), Category::HerbalTeas);
        assert_eq!(product.details.shared_attribute(), Some("high"));
        assert!(product.in_stock);
    }

    #[test]
    fn test_attributes_roundtrip_through_column() {
        let details = ProductDetails::Shampoos(ShampooDetails {
            hair_type: Some("curly".to_owned()),
            scent: None,
        });
        let column = details.to_attributes();
        assert!(column.get("category").is_none());
        let decoded = ProductDetails::from_attributes(Category::Shampoos, column).unwrap();
        assert_eq!(decoded, details);
    }

    #[test]
    fn test_from_attributes_null_is_empty() {
        let decoded = ProductDetails::from_attributes(Category::Oils, Value::Null).unwrap();
        assert_eq!(decoded, ProductDetails::empty(Category::Oils));
    }

    #[test]
    fn test_from_attributes_rejects_non_object() {
        assert!(ProductDetails::from_attributes(Category::Oils, Value::from(3)).is_err());
    }

    #[test]
    fn test_has_badge_case_insensitive() {
        let mut product = sample_product(Category::Soaps, "Oat Bar", 8_00);
        product.badges = vec!["Bestseller".to_owned(), "new".to_owned()];
        assert!(product.has_badge("bestseller"));
        assert!(product.has_badge(" NEW "));
        assert!(!product.has_badge("sale"));
    }
}
