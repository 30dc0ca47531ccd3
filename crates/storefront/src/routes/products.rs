//! Catalog route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use herbwell_core::Category;

use super::{ApiPath, ApiQuery};
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Related products returned when no limit is given.
const DEFAULT_RELATED_LIMIT: u32 = 4;
const MAX_RELATED_LIMIT: u32 = 24;

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<u32>,
}

/// Parse a category path segment. Unknown categories are a 404.
pub(crate) fn parse_category(raw: &str) -> Result<Category> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("category {raw}")))
}

/// Every product in a category.
///
/// GET /api/products/{category}
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiPath(category): ApiPath<String>,
) -> Result<Json<Vec<Product>>> {
    let category = parse_category(&category)?;
    let products = CatalogService::new(state.db(), state.catalog_cache())
        .list_category(category)
        .await?;
    Ok(Json(products.as_ref().clone()))
}

/// One product.
///
/// GET /api/products/{category}/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath((category, slug)): ApiPath<(String, String)>,
) -> Result<Json<Product>> {
    let category = parse_category(&category)?;
    CatalogService::new(state.db(), state.catalog_cache())
        .get_by_slug(category, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))
}

/// Products related to one product.
///
/// GET /api/products/{category}/{slug}/related?limit=
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    ApiPath((category, slug)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<RelatedQuery>,
) -> Result<Json<Vec<Product>>> {
    let category = parse_category(&category)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RELATED_LIMIT)
        .min(MAX_RELATED_LIMIT);
    CatalogService::new(state.db(), state.catalog_cache())
        .related(category, &slug, limit)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))
}

/// Products from every category carrying a badge. Each product carries its
/// `category`.
///
/// GET /api/badges/{badge}
#[instrument(skip(state))]
pub async fn with_badge(
    State(state): State<AppState>,
    ApiPath(badge): ApiPath<String>,
) -> Json<Vec<Product>> {
    Json(
        CatalogService::new(state.db(), state.catalog_cache())
            .products_with_badge(&badge)
            .await,
    )
}
