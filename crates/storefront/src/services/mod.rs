//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Category reads, badge views, review-to-product resolution
//! - `cart` - Cart and wishlist persistence around the core reducers
//! - `orders` - Checkout and admin status updates
//! - `notifications` - Detached order status emails
//! - `email` - Mail transports (`SmtpMailer`, `LogMailer`)
//! - `reviews` - Review submission and rating aggregation
//! - `admin` - Admin listings and bundle management
//!
//! Services borrow what they need from [`crate::state::AppState`] for the
//! duration of one request.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod notifications;
pub mod orders;
pub mod reviews;
