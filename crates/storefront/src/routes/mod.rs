//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Readiness (database ping)
//!
//! # Catalog
//! GET    /api/products/{category}              - Category listing
//! GET    /api/products/{category}/{slug}       - Product detail
//! GET    /api/products/{category}/{slug}/related?limit=
//! GET    /api/badges/{badge}                   - Products carrying a badge, all categories
//! GET    /api/bundles                          - Active bundles
//! GET    /api/bundles/{slug}                   - Bundle detail
//!
//! # Cart and wishlist (session)
//! GET    /api/cart
//! DELETE /api/cart
//! POST   /api/cart/items
//! PATCH  /api/cart/items/{product_id}
//! DELETE /api/cart/items/{product_id}
//! POST   /api/cart/panel
//! GET    /api/wishlist
//! POST   /api/wishlist/items
//! DELETE /api/wishlist/items/{product_id}
//! POST   /api/wishlist/toggle
//!
//! # Reviews
//! GET    /api/reviews?productId=
//! POST   /api/reviews                          - Requires bearer token
//! GET    /api/reviews/average?productIds=a,b
//!
//! # Checkout
//! POST   /api/process-order
//!
//! # Admin (bearer token with admin role)
//! GET    /api/admin/orders
//! PATCH  /api/admin/orders                     - Status update
//! GET    /api/admin/orders/{id}/emails         - Notification audit log
//! GET    /api/admin/users
//! GET    /api/admin/bundles
//! POST   /api/admin/bundles
//! GET    /api/admin/bundles/{id}
//! PUT    /api/admin/bundles/{id}
//! DELETE /api/admin/bundles/{id}
//! GET    /api/admin/reviews
//! DELETE /api/admin/reviews/{id}
//! ```

pub mod admin;
pub mod bundles;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, Request},
    middleware::from_fn,
    routing::{delete, get, patch, post},
};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;
use tracing::info_span;

use crate::error::AppError;
use crate::middleware::{
    checkout_rate_limiter, create_session_layer, request_id_middleware, review_rate_limiter,
};
use crate::state::AppState;

/// JSON body extractor whose rejections are `400` with the usual error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections are `400` with the usual error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections are `400` with the usual error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Catalog and bundle routes.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products/{category}", get(products::list))
        .route("/products/{category}/{slug}", get(products::show))
        .route("/products/{category}/{slug}/related", get(products::related))
        .route("/badges/{badge}", get(products::with_badge))
        .route("/bundles", get(bundles::index))
        .route("/bundles/{slug}", get(bundles::show))
}

/// Cart and wishlist routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{product_id}",
            patch(cart::set_quantity).delete(cart::remove),
        )
        .route("/cart/panel", post(cart::panel))
        .route("/wishlist", get(cart::show_wishlist))
        .route("/wishlist/items", post(cart::add_to_wishlist))
        .route(
            "/wishlist/items/{product_id}",
            delete(cart::remove_from_wishlist),
        )
        .route("/wishlist/toggle", post(cart::toggle_wishlist))
}

/// Review routes. Submission is rate limited when `rate_limit` is set.
pub fn review_routes(rate_limit: bool) -> Router<AppState> {
    let mut submit = post(reviews::create);
    if rate_limit && let Some(limiter) = review_rate_limiter() {
        submit = submit.route_layer(limiter);
    }

    Router::new()
        .route("/reviews", get(reviews::list).merge(submit))
        .route("/reviews/average", get(reviews::averages))
}

/// Checkout route. Rate limited when `rate_limit` is set.
pub fn checkout_routes(rate_limit: bool) -> Router<AppState> {
    let mut place = post(orders::process_order);
    if rate_limit && let Some(limiter) = checkout_rate_limiter() {
        place = place.route_layer(limiter);
    }
    Router::new().route("/process-order", place)
}

/// Admin routes. Every handler takes `RequireAdmin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(admin::list_orders).patch(admin::update_order_status),
        )
        .route("/orders/{id}/emails", get(admin::order_emails))
        .route("/users", get(admin::list_users))
        .route(
            "/bundles",
            get(admin::list_bundles).post(admin::create_bundle),
        )
        .route(
            "/bundles/{id}",
            get(admin::get_bundle)
                .put(admin::update_bundle)
                .delete(admin::delete_bundle),
        )
        .route("/reviews", get(admin::list_reviews))
        .route("/reviews/{id}", delete(admin::delete_review))
}

/// Create all API routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .merge(cart_routes())
        .merge(review_routes(rate_limit))
        .merge(checkout_routes(rate_limit))
        .nest("/admin", admin_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}

/// The complete application: routes, sessions, tracing and Sentry.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes(state.config().rate_limit)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(NewSentryLayer::new_from_top())
        .layer(SentryHttpLayer::new().enable_transaction())
}
