//! Cart and wishlist persistence.
//!
//! The reducers in [`herbwell_core::cart`] are pure. This module loads the
//! current state, applies one action and saves the result, so every mutation
//! is persisted before the response goes out. Stored state is rehydrated
//! through `normalized()` on every load.

use async_trait::async_trait;
use thiserror::Error;
use tower_sessions::Session;
use tracing::{instrument, warn};

use herbwell_core::cart::{CartAction, CartState, WishlistAction, WishlistState};

use crate::models::session_keys;

#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Where cart and wishlist state lives between requests.
#[async_trait]
pub trait CartPersistence: Send + Sync {
    async fn load_cart(&self) -> Result<CartState, CartStoreError>;

    async fn save_cart(&self, cart: &CartState) -> Result<(), CartStoreError>;

    async fn load_wishlist(&self) -> Result<WishlistState, CartStoreError>;

    async fn save_wishlist(&self, wishlist: &WishlistState) -> Result<(), CartStoreError>;
}

/// Cart persistence in the visitor's session.
#[derive(Clone)]
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Read a value, treating undecodable data as absent.
    async fn read<T>(&self, key: &str) -> Result<Option<T>, CartStoreError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.session.get::<T>(key).await {
            Ok(value) => Ok(value),
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                warn!(key, error = %e, "Discarding unreadable session state");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CartPersistence for SessionCartStore {
    async fn load_cart(&self) -> Result<CartState, CartStoreError> {
        Ok(self
            .read::<CartState>(session_keys::CART)
            .await?
            .unwrap_or_default()
            .normalized())
    }

    async fn save_cart(&self, cart: &CartState) -> Result<(), CartStoreError> {
        self.session.insert(session_keys::CART, cart).await?;
        Ok(())
    }

    async fn load_wishlist(&self) -> Result<WishlistState, CartStoreError> {
        Ok(self
            .read::<WishlistState>(session_keys::WISHLIST)
            .await?
            .unwrap_or_default()
            .normalized())
    }

    async fn save_wishlist(&self, wishlist: &WishlistState) -> Result<(), CartStoreError> {
        self.session.insert(session_keys::WISHLIST, wishlist).await?;
        Ok(())
    }
}

/// Apply one cart action and persist the result.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded or saved.
#[instrument(skip(store))]
pub async fn update_cart(
    store: &dyn CartPersistence,
    action: CartAction,
) -> Result<CartState, CartStoreError> {
    let cart = store.load_cart().await?.apply(action);
    store.save_cart(&cart).await?;
    Ok(cart)
}

/// Apply one wishlist action and persist the result.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded or saved.
#[instrument(skip(store))]
pub async fn update_wishlist(
    store: &dyn CartPersistence,
    action: WishlistAction,
) -> Result<WishlistState, CartStoreError> {
    let wishlist = store.load_wishlist().await?.apply(action);
    store.save_wishlist(&wishlist).await?;
    Ok(wishlist)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tokio::sync::Mutex;
    use tower_sessions::MemoryStore;

    use herbwell_core::cart::{CartItem, WishlistItem};
    use herbwell_core::{Category, ProductId};

    use super::*;

    /// Stores serialized JSON, like a browser's local storage would.
    #[derive(Default)]
    struct JsonStore {
        cart: Mutex<Option<String>>,
        wishlist: Mutex<Option<String>>,
    }

    #[async_trait]
    impl CartPersistence for JsonStore {
        async fn load_cart(&self) -> Result<CartState, CartStoreError> {
            Ok(self
                .cart
                .lock()
                .await
                .as_deref()
                .map(|raw| serde_json::from_str::<CartState>(raw).unwrap())
                .unwrap_or_default()
                .normalized())
        }

        async fn save_cart(&self, cart: &CartState) -> Result<(), CartStoreError> {
            *self.cart.lock().await = Some(serde_json::to_string(cart).unwrap());
            Ok(())
        }

        async fn load_wishlist(&self) -> Result<WishlistState, CartStoreError> {
            Ok(self
                .wishlist
                .lock()
                .await
                .as_deref()
                .map(|raw| serde_json::from_str::<WishlistState>(raw).unwrap())
                .unwrap_or_default()
                .normalized())
        }

        async fn save_wishlist(&self, wishlist: &WishlistState) -> Result<(), CartStoreError> {
            *self.wishlist.lock().await = Some(serde_json::to_string(wishlist).unwrap());
            Ok(())
        }
    }

    fn soap() -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            title: "Oat Soap".to_string(),
            image: None,
            price: Decimal::new(8_50, 2),
            category: Category::Soaps,
            slug: "oat-soap".to_string(),
            quantity: 1,
            in_stock: true,
        }
    }

    #[tokio::test]
    async fn test_every_mutation_is_persisted() {
        let store = JsonStore::default();
        let item = soap();
        let id = item.product_id;

        update_cart(&store, CartAction::Add { item: item.clone() }).await.unwrap();
        update_cart(&store, CartAction::Add { item }).await.unwrap();
        let reloaded = store.load_cart().await.unwrap();
        assert_eq!(reloaded.item_count(), 2);
        assert_eq!(reloaded.total_price(), Some(Decimal::new(17_00, 2)));

        update_cart(
            &store,
            CartAction::SetQuantity {
                product_id: id,
                quantity: 0,
            },
        )
        .await
        .unwrap();
        assert!(store.load_cart().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rehydration_repairs_stored_cart() {
        let store = JsonStore::default();
        let item = soap();
        let stale = CartState {
            items: vec![item.clone(), item],
            is_open: false,
        };
        *store.cart.lock().await = Some(serde_json::to_string(&stale).unwrap());

        let cart = store.load_cart().await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_session_store_round_trips_wishlist() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let store = SessionCartStore::new(session);
        let saved = WishlistItem {
            product_id: ProductId::generate(),
            title: "Argan Oil".to_string(),
            image: None,
            price: Decimal::new(18_00, 2),
            category: Category::Oils,
            slug: "argan-oil".to_string(),
            in_stock: true,
        };

        update_wishlist(&store, WishlistAction::Toggle { item: saved.clone() })
            .await
            .unwrap();
        assert!(store.load_wishlist().await.unwrap().contains(saved.product_id));

        update_wishlist(&store, WishlistAction::Toggle { item: saved.clone() })
            .await
            .unwrap();
        assert!(!store.load_wishlist().await.unwrap().contains(saved.product_id));
    }
}
