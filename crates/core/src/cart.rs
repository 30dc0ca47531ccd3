//! Cart and wishlist reducers.
//!
//! Both containers are pure state machines: an action goes in, a new state
//! comes out. Persisting the state between requests is the job of an
//! adapter in the storefront crate, which saves after every mutation and
//! rehydrates through [`CartState::normalized`] / [`WishlistState::normalized`].
//!
//! Invariants held after every action:
//! - every cart line has `quantity >= 1` (setting 0 or less removes the line)
//! - at most one line per product
//! - item count and total price are derived, never stored

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Category, ProductId, line_total};

/// Snapshot of a product at the moment it was put in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Decimal,
    pub category: Category,
    pub slug: String,
    pub quantity: u32,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl CartItem {
    /// Price of this line (`price * quantity`), `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        line_total(self.price, self.quantity)
    }
}

/// Mutations accepted by the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartAction {
    /// Add a product; an existing line has its quantity increased.
    Add { item: CartItem },
    /// Drop a line entirely.
    Remove { product_id: ProductId },
    /// Set a line's quantity. Zero or less removes the line.
    SetQuantity { product_id: ProductId, quantity: i64 },
    /// Empty the cart (after checkout).
    Clear,
    OpenPanel,
    ClosePanel,
    TogglePanel,
}

/// Cart contents plus the open/closed state of the cart drawer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub is_open: bool,
}

impl CartState {
    /// Apply one action and return the next state.
    #[must_use]
    pub fn apply(mut self, action: CartAction) -> Self {
        match action {
            CartAction::Add { mut item } => {
                item.quantity = item.quantity.max(1);
                if let Some(line) = self
                    .items
                    .iter_mut()
                    .find(|line| line.product_id == item.product_id)
                {
                    line.quantity = line.quantity.saturating_add(item.quantity);
                    line.price = item.price;
                    line.in_stock = item.in_stock;
                    line.title = item.title;
                    line.image = item.image;
                } else {
                    self.items.push(item);
                }
            }
            CartAction::Remove { product_id } => {
                self.items.retain(|line| line.product_id != product_id);
            }
            CartAction::SetQuantity {
                product_id,
                quantity,
            } => match u32::try_from(quantity) {
                Ok(quantity) if quantity >= 1 => {
                    if let Some(line) = self
                        .items
                        .iter_mut()
                        .find(|line| line.product_id == product_id)
                    {
                        line.quantity = quantity;
                    }
                }
                _ => self.items.retain(|line| line.product_id != product_id),
            },
            CartAction::Clear => self.items.clear(),
            CartAction::OpenPanel => self.is_open = true,
            CartAction::ClosePanel => self.is_open = false,
            CartAction::TogglePanel => self.is_open = !self.is_open,
        }
        self
    }

    /// Repair a rehydrated state: drop zero-quantity lines and merge duplicates.
    #[must_use]
    pub fn normalized(self) -> Self {
        let is_open = self.is_open;
        let mut state = Self {
            items: Vec::with_capacity(self.items.len()),
            is_open,
        };
        for item in self.items.into_iter().filter(|item| item.quantity >= 1) {
            state = state.apply(CartAction::Add { item });
        }
        state
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Sum of every line total, or `None` if it overflows.
    #[must_use]
    pub fn total_price(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Snapshot of a saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Decimal,
    pub category: Category,
    pub slug: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

/// Mutations accepted by the wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WishlistAction {
    Add { item: WishlistItem },
    Remove { product_id: ProductId },
    /// Add when absent, remove when present.
    Toggle { item: WishlistItem },
    Clear,
}

/// Saved products, at most one entry per product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistState {
    #[serde(default)]
    pub items: Vec<WishlistItem>,
}

impl WishlistState {
    /// Apply one action and return the next state.
    #[must_use]
    pub fn apply(mut self, action: WishlistAction) -> Self {
        match action {
            WishlistAction::Add { item } => {
                if !self.contains(item.product_id) {
                    self.items.push(item);
                }
            }
            WishlistAction::Remove { product_id } => {
                self.items.retain(|entry| entry.product_id != product_id);
            }
            WishlistAction::Toggle { item } => {
                if self.contains(item.product_id) {
                    self.items.retain(|entry| entry.product_id != item.product_id);
                } else {
                    self.items.push(item);
                }
            }
            WishlistAction::Clear => self.items.clear(),
        }
        self
    }

    /// Drop duplicate entries from a rehydrated state.
    #[must_use]
    pub fn normalized(self) -> Self {
        self.items
            .into_iter()
            .fold(Self::default(), |state, item| {
                state.apply(WishlistAction::Add { item })
            })
    }

    /// Whether a product is saved.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|entry| entry.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            title: title.to_owned(),
            image: None,
            price: Decimal::new(cents, 2),
            category: Category::Soaps,
            slug: title.to_lowercase().replace(' ', "-"),
            quantity,
            in_stock: true,
        }
    }

    fn saved(title: &str) -> WishlistItem {
        WishlistItem {
            product_id: ProductId::generate(),
            title: title.to_owned(),
            image: None,
            price: Decimal::new(10_00, 2),
            category: Category::Oils,
            slug: title.to_lowercase(),
            in_stock: true,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let soap = item("Lavender Soap", 12_00, 1);
        let state = CartState::default()
            .apply(CartAction::Add { item: soap.clone() })
            .apply(CartAction::Add { item: soap });
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.item_count(), 2);
    }

    #[test]
    fn test_add_zero_quantity_counts_as_one() {
        let state = CartState::default().apply(CartAction::Add {
            item: item("Mint Tea", 10_00, 0),
        });
        assert_eq!(state.item_count(), 1);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let soap = item("Lavender Soap", 12_00, 3);
        let id = soap.product_id;
        let state = CartState::default()
            .apply(CartAction::Add { item: soap })
            .apply(CartAction::SetQuantity {
                product_id: id,
                quantity: 0,
            });
        assert!(state.is_empty());
    }

    #[test]
    fn test_set_negative_quantity_removes() {
        let soap = item("Lavender Soap", 12_00, 3);
        let id = soap.product_id;
        let state = CartState::default()
            .apply(CartAction::Add { item: soap })
            .apply(CartAction::SetQuantity {
                product_id: id,
                quantity: -4,
            });
        assert!(state.is_empty());
    }

    #[test]
    fn test_set_quantity_updates_line() {
        let soap = item("Lavender Soap", 12_00, 1);
        let id = soap.product_id;
        let state = CartState::default()
            .apply(CartAction::Add { item: soap })
            .apply(CartAction::SetQuantity {
                product_id: id,
                quantity: 5,
            });
        assert_eq!(state.item_count(), 5);
        assert_eq!(state.total_price(), Some(Decimal::new(60_00, 2)));
    }

    #[test]
    fn test_derived_totals() {
        let state = CartState::default()
            .apply(CartAction::Add {
                item: item("Soap A", 12_00, 2),
            })
            .apply(CartAction::Add {
                item: item("Tea B", 10_00, 1),
            });
        assert_eq!(state.item_count(), 3);
        assert_eq!(state.total_price(), Some(Decimal::new(34_00, 2)));
    }

    #[test]
    fn test_total_price_overflow() {
        let mut pricey = item("Gold Balm", 1, 1);
        pricey.price = Decimal::MAX;
        let state = CartState::default()
            .apply(CartAction::Add { item: pricey })
            .apply(CartAction::Add {
                item: item("Tea B", 10_00, 1),
            });
        assert_eq!(state.total_price(), None);
    }

    #[test]
    fn test_clear_and_panel() {
        let state = CartState::default()
            .apply(CartAction::Add {
                item: item("Soap A", 12_00, 2),
            })
            .apply(CartAction::OpenPanel);
        assert!(state.is_open);

        let state = state.apply(CartAction::TogglePanel).apply(CartAction::Clear);
        assert!(!state.is_open);
        assert!(state.is_empty());
        assert_eq!(state.total_price(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_normalized_repairs_stored_state() {
        let soap = item("Soap A", 12_00, 1);
        let mut duplicate = soap.clone();
        duplicate.quantity = 2;
        let stale = CartState {
            items: vec![soap, duplicate, item("Ghost", 5_00, 0)],
            is_open: true,
        };

        let state = stale.normalized();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.item_count(), 3);
        assert!(state.is_open);
    }

    #[test]
    fn test_cart_action_wire_format() {
        let json = r#"{"type":"set_quantity","product_id":"6f1c2f43-43a3-4a9e-9d5c-0f0c1f2d3e4a","quantity":2}"#;
        let action: CartAction = serde_json::from_str(json).expect("valid action");
        assert!(matches!(action, CartAction::SetQuantity { quantity: 2, .. }));
    }

    #[test]
    fn test_wishlist_toggle() {
        let oil = saved("Argan");
        let state = WishlistState::default().apply(WishlistAction::Toggle { item: oil.clone() });
        assert!(state.contains(oil.product_id));

        let state = state.apply(WishlistAction::Toggle { item: oil.clone() });
        assert!(!state.contains(oil.product_id));
    }

    #[test]
    fn test_wishlist_add_is_idempotent() {
        let oil = saved("Argan");
        let state = WishlistState::default()
            .apply(WishlistAction::Add { item: oil.clone() })
            .apply(WishlistAction::Add { item: oil });
        assert_eq!(state.items.len(), 1);

        let state = state.apply(WishlistAction::Clear);
        assert!(state.items.is_empty());
    }
}
