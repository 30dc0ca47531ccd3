//! Admin API handlers.
//!
//! Every handler takes [`RequireAdmin`]: 401 without a valid token, 403 for
//! non-admin roles.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use herbwell_core::{BundleId, OrderId, OrderStatus, ReviewId};

use super::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Bundle, BundleInput, EmailLogEntry};
use crate::services::admin::{AdminOrderView, AdminReviewView, AdminService, AdminUserView};
use crate::services::orders::OrderService;
use crate::state::AppState;

fn service(state: &AppState) -> AdminService<'_> {
    AdminService::new(state.db(), state.catalog_cache())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

/// GET /api/admin/orders
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<AdminOrderView>>> {
    Ok(Json(service(&state).list_orders().await?))
}

/// Change an order's status. The customer email goes out in the background;
/// its outcome does not affect the response.
///
/// PATCH /api/admin/orders
#[instrument(skip_all, fields(admin = %admin.id, order_id = %request.order_id, status = %request.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<Json<Success>> {
    OrderService::new(state.db(), state.config().shipping, state.notifier())
        .update_status(request.order_id, request.status)
        .await?;
    Ok(Json(Success { success: true }))
}

/// Notification audit rows for one order.
///
/// GET /api/admin/orders/{id}/emails
#[instrument(skip_all, fields(admin = %admin.id, order_id = %id))]
pub async fn order_emails(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Vec<EmailLogEntry>>> {
    Ok(Json(state.db().list_emails_for_order(id).await?))
}

/// GET /api/admin/users
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<AdminUserView>>> {
    Ok(Json(service(&state).list_users().await?))
}

/// GET /api/admin/bundles
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_bundles(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<Bundle>>> {
    Ok(Json(service(&state).list_bundles().await?))
}

/// POST /api/admin/bundles
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn create_bundle(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<BundleInput>,
) -> Result<(StatusCode, Json<Bundle>)> {
    let bundle = service(&state).create_bundle(input).await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

/// GET /api/admin/bundles/{id}
#[instrument(skip_all, fields(admin = %admin.id, bundle_id = %id))]
pub async fn get_bundle(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<BundleId>,
) -> Result<Json<Bundle>> {
    Ok(Json(service(&state).get_bundle(id).await?))
}

/// PUT /api/admin/bundles/{id}
#[instrument(skip_all, fields(admin = %admin.id, bundle_id = %id))]
pub async fn update_bundle(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<BundleId>,
    ApiJson(input): ApiJson<BundleInput>,
) -> Result<Json<Bundle>> {
    Ok(Json(service(&state).update_bundle(id, input).await?))
}

/// DELETE /api/admin/bundles/{id}
#[instrument(skip_all, fields(admin = %admin.id, bundle_id = %id))]
pub async fn delete_bundle(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<BundleId>,
) -> Result<Json<Success>> {
    service(&state).delete_bundle(id).await?;
    Ok(Json(Success { success: true }))
}

/// GET /api/admin/reviews
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_reviews(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<AdminReviewView>>> {
    Ok(Json(service(&state).list_reviews().await?))
}

/// DELETE /api/admin/reviews/{id}
#[instrument(skip_all, fields(admin = %admin.id, review_id = %id))]
pub async fn delete_review(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ReviewId>,
) -> Result<Json<Success>> {
    service(&state).delete_review(id).await?;
    Ok(Json(Success { success: true }))
}
