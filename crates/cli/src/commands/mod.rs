//! CLI command implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Storefront database URL, with the same fallback the server uses.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
