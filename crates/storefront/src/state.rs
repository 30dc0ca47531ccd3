//! Application state shared across handlers.

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation};
use secrecy::ExposeSecret;

use crate::config::StorefrontConfig;
use crate::db::Database;
use crate::services::catalog::{CategoryCache, build_category_cache};
use crate::services::email::Mailer;
use crate::services::notifications::Notifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    db: Arc<dyn Database>,
    catalog_cache: CategoryCache,
    notifier: Notifier,
    jwt_key: DecodingKey,
    jwt_validation: Validation,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `db` - Backing store (`PgDatabase` in production)
    /// * `mailer` - Transport for customer notifications
    #[must_use]
    pub fn new(config: StorefrontConfig, db: Arc<dyn Database>, mailer: Arc<dyn Mailer>) -> Self {
        let catalog_cache = build_category_cache(config.catalog_cache_ttl);
        let notifier = Notifier::new(Arc::clone(&db), mailer);
        let jwt_key = DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());
        let mut jwt_validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        // Hosted auth tokens carry an `aud` we do not pin.
        jwt_validation.validate_aud = false;

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                catalog_cache,
                notifier,
                jwt_key,
                jwt_validation,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.inner.db.as_ref()
    }

    #[must_use]
    pub fn catalog_cache(&self) -> &CategoryCache {
        &self.inner.catalog_cache
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Key and rules for verifying bearer tokens.
    #[must_use]
    pub fn jwt(&self) -> (&DecodingKey, &Validation) {
        (&self.inner.jwt_key, &self.inner.jwt_validation)
    }
}
