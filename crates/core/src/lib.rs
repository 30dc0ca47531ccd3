//! Herbwell Core - Shared domain types.
//!
//! This crate provides the types and pure logic shared by every Herbwell
//! component:
//! - `storefront` - Public API, checkout and the admin API
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Persistence lives behind adapters in the
//! storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, categories, statuses, ratings and money
//! - [`cart`] - Cart and wishlist reducers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use types::*;
