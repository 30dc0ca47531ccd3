//! Review route handlers.

use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use herbwell_core::{ProductId, RatingSummary};

use super::{ApiJson, ApiQuery};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::ReviewWithAuthor;
use crate::services::reviews::{ProductReviews, ReviewService, ReviewSubmission, parse_product_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AveragesQuery {
    pub product_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AveragesResponse {
    pub averages: HashMap<ProductId, RatingSummary>,
}

/// Reviews of one product with average and count.
///
/// GET /api/reviews?productId=
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReviewsQuery>,
) -> Result<Json<ProductReviews>> {
    let product_id = parse_product_id(query.product_id.as_deref().unwrap_or_default())?;
    Ok(Json(
        ReviewService::new(state.db())
            .list_reviews(product_id)
            .await?,
    ))
}

/// Submit a review as the authenticated user.
///
/// POST /api/reviews
#[instrument(skip(state, user, submission), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(submission): ApiJson<ReviewSubmission>,
) -> Result<(StatusCode, Json<ReviewWithAuthor>)> {
    let review = ReviewService::new(state.db())
        .create_review(user.id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Rating summaries for a comma-separated list of products.
///
/// GET /api/reviews/average?productIds=a,b
#[instrument(skip(state))]
pub async fn averages(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AveragesQuery>,
) -> Result<Json<AveragesResponse>> {
    let raw = query
        .product_ids
        .filter(|ids| !ids.trim().is_empty())
        .ok_or_else(|| AppError::Validation("productIds is required".to_string()))?;
    let product_ids = raw
        .split(',')
        .filter(|id| !id.trim().is_empty())
        .map(parse_product_id)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let averages = ReviewService::new(state.db())
        .averages_for_many(&product_ids)
        .await?;
    Ok(Json(AveragesResponse { averages }))
}
