//! Core types for Herbwell.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod email;
pub mod id;
pub mod price;
pub mod rating;
pub mod status;

pub use category::{Category, CategoryError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{ShippingPolicy, format_money, line_total};
pub use rating::{Rating, RatingError, RatingSummary};
pub use status::*;
