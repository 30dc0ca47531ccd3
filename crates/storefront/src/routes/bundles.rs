//! Public bundle routes.

use axum::{Json, extract::State};
use tracing::instrument;

use super::ApiPath;
use crate::error::{AppError, Result};
use crate::models::Bundle;
use crate::state::AppState;

/// Active bundles, newest first.
///
/// GET /api/bundles
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Bundle>>> {
    Ok(Json(state.db().list_bundles(true).await?))
}

/// One active bundle.
///
/// GET /api/bundles/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Bundle>> {
    state
        .db()
        .get_bundle_by_slug(&slug)
        .await?
        .filter(|bundle| bundle.is_active)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("bundle {slug}")))
}
