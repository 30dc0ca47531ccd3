//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types
//! (which live next to the queries in [`crate::db::postgres`]).

pub mod address;
pub mod bundle;
pub mod email_log;
pub mod order;
pub mod product;
pub mod profile;
pub mod review;
pub mod session;

pub use address::{Address, NewAddress};
pub use bundle::{Bundle, BundleInput, BundleItem};
pub use email_log::{EmailLogEntry, NewEmailLog};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use product::{Product, ProductDetails};
pub use profile::Profile;
pub use review::{NewReview, Review, ReviewAuthor, ReviewWithAuthor};
pub use session::session_keys;
