//! Cart and wishlist route handlers.
//!
//! State lives in the visitor's session. Items are snapshotted from the
//! catalog when added, so the client only names the product.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use herbwell_core::ProductId;
use herbwell_core::cart::{CartAction, CartItem, CartState, WishlistAction, WishlistState};

use super::products::parse_category;
use super::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::services::cart::{CartPersistence, SessionCartStore, update_cart, update_wishlist};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Cart as returned to the client, with derived totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub is_open: bool,
    pub item_count: u32,
    /// `null` when the total does not fit in a decimal.
    pub total_price: Option<Decimal>,
}

impl From<CartState> for CartView {
    fn from(cart: CartState) -> Self {
        Self {
            item_count: cart.item_count(),
            total_price: cart.total_price(),
            is_open: cart.is_open,
            items: cart.items,
        }
    }
}

/// Names a catalog product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub category: String,
    pub slug: String,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelCommand {
    Open,
    Close,
    Toggle,
}

#[derive(Debug, Deserialize)]
pub struct PanelRequest {
    pub action: PanelCommand,
}

async fn lookup(state: &AppState, product: &ProductRef) -> Result<Product> {
    let category = parse_category(&product.category)?;
    CatalogService::new(state.db(), state.catalog_cache())
        .get_by_slug(category, &product.slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", product.slug)))
}

/// GET /api/cart
#[instrument(skip_all)]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = SessionCartStore::new(session).load_cart().await?;
    Ok(Json(cart.into()))
}

/// POST /api/cart/items
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    ApiJson(product): ApiJson<ProductRef>,
) -> Result<Json<CartView>> {
    let item = lookup(&state, &product)
        .await?
        .to_cart_item(product.quantity.unwrap_or(1));
    let store = SessionCartStore::new(session);
    Ok(Json(update_cart(&store, CartAction::Add { item }).await?.into()))
}

/// PATCH /api/cart/items/{product_id}
#[instrument(skip(session))]
pub async fn set_quantity(
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(update): ApiJson<QuantityUpdate>,
) -> Result<Json<CartView>> {
    let store = SessionCartStore::new(session);
    let action = CartAction::SetQuantity {
        product_id,
        quantity: update.quantity,
    };
    Ok(Json(update_cart(&store, action).await?.into()))
}

/// DELETE /api/cart/items/{product_id}
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<CartView>> {
    let store = SessionCartStore::new(session);
    Ok(Json(
        update_cart(&store, CartAction::Remove { product_id })
            .await?
            .into(),
    ))
}

/// DELETE /api/cart
#[instrument(skip_all)]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let store = SessionCartStore::new(session);
    Ok(Json(update_cart(&store, CartAction::Clear).await?.into()))
}

/// POST /api/cart/panel
#[instrument(skip(session))]
pub async fn panel(
    session: Session,
    ApiJson(request): ApiJson<PanelRequest>,
) -> Result<Json<CartView>> {
    let action = match request.action {
        PanelCommand::Open => CartAction::OpenPanel,
        PanelCommand::Close => CartAction::ClosePanel,
        PanelCommand::Toggle => CartAction::TogglePanel,
    };
    let store = SessionCartStore::new(session);
    Ok(Json(update_cart(&store, action).await?.into()))
}

/// GET /api/wishlist
#[instrument(skip_all)]
pub async fn show_wishlist(session: Session) -> Result<Json<WishlistState>> {
    Ok(Json(SessionCartStore::new(session).load_wishlist().await?))
}

/// POST /api/wishlist/items
#[instrument(skip(state, session))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    session: Session,
    ApiJson(product): ApiJson<ProductRef>,
) -> Result<Json<WishlistState>> {
    let item = lookup(&state, &product).await?.to_wishlist_item();
    let store = SessionCartStore::new(session);
    Ok(Json(
        update_wishlist(&store, WishlistAction::Add { item }).await?,
    ))
}

/// DELETE /api/wishlist/items/{product_id}
#[instrument(skip(session))]
pub async fn remove_from_wishlist(
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<WishlistState>> {
    let store = SessionCartStore::new(session);
    Ok(Json(
        update_wishlist(&store, WishlistAction::Remove { product_id }).await?,
    ))
}

/// POST /api/wishlist/toggle
#[instrument(skip(state, session))]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    session: Session,
    ApiJson(product): ApiJson<ProductRef>,
) -> Result<Json<WishlistState>> {
    let item = lookup(&state, &product).await?.to_wishlist_item();
    let store = SessionCartStore::new(session);
    Ok(Json(
        update_wishlist(&store, WishlistAction::Toggle { item }).await?,
    ))
}
