//! Session keys.
//!
//! The cart and wishlist are stored in the `tower-sessions` session as
//! serialized [`herbwell_core::cart::CartState`] /
//! [`herbwell_core::cart::WishlistState`] values.

/// Keys under which per-visitor state is stored.
pub mod session_keys {
    /// Serialized cart state.
    pub const CART: &str = "cart";

    /// Serialized wishlist state.
    pub const WISHLIST: &str = "wishlist";
}
