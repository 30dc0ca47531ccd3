//! Herbwell Storefront library.
//!
//! The catalog, cart, checkout, review and admin APIs as a library, so the
//! server binary and the integration tests build the same router through
//! [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
