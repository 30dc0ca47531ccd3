//! Herbwell Storefront - catalog, checkout and admin API.
//!
//! This binary serves the storefront API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON API consumed by the storefront frontend
//! - `PostgreSQL` for the catalog, orders, reviews and sessions
//! - Bearer JWTs from the hosted auth backend for customers and admins
//! - SMTP (lettre) for order status notifications
//!
//! Without a database URL the server runs against an in-memory store. That
//! mode is for local development only: nothing survives a restart.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herbwell_storefront::config::{ConfigError, StorefrontConfig};
use herbwell_storefront::db::{self, MemoryDatabase, PgDatabase};
use herbwell_storefront::services::email::{LogMailer, Mailer, SmtpMailer};
use herbwell_storefront::{AppState, app};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("SMTP setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.sentry_environment.clone().into()),
            traces_sample_rate: 0.1,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn build_mailer(config: &StorefrontConfig) -> Result<Arc<dyn Mailer>, StartupError> {
    match &config.email {
        Some(email) => {
            tracing::info!(smtp_host = %email.smtp_host, "SMTP mailer configured");
            Ok(Arc::new(SmtpMailer::new(email)?))
        }
        None => {
            tracing::warn!("SMTP not configured, notifications will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

async fn run(config: StorefrontConfig) -> Result<(), StartupError> {
    let mailer = build_mailer(&config)?;
    let addr = config.socket_addr();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p herbwell-cli -- migrate
    let router = if let Some(database_url) = config.database_url.clone() {
        let pool = db::create_pool(&database_url).await?;
        tracing::info!("Database pool created");
        let session_store = PostgresStore::new(pool.clone());
        let state = AppState::new(config, Arc::new(PgDatabase::new(pool)), mailer);
        app(state, session_store)
    } else {
        tracing::warn!("No database URL configured, using in-memory store (development only)");
        let state = AppState::new(config, Arc::new(MemoryDatabase::new()), mailer);
        app(state, MemoryStore::default())
    };

    tracing::info!("storefront listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Load .env before reading configuration
    let _ = dotenvy::dotenv();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "herbwell_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Storefront stopped with an error");
            std::process::ExitCode::FAILURE
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
