//! Checkout route.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use herbwell_core::UserId;
use herbwell_core::cart::{CartAction, CartItem};

use super::ApiJson;
use crate::error::Result;
use crate::models::{Order, OrderItem};
use crate::services::cart::{SessionCartStore, update_cart};
use crate::services::orders::{OrderData, OrderService, PlaceOrder, PlacedOrder};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOrderRequest {
    #[serde(default)]
    pub order_data: Option<OrderData>,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOrderResponse {
    pub success: bool,
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

/// Place an order.
///
/// POST /api/process-order
///
/// The session cart is emptied once the order is stored.
#[instrument(skip_all, fields(lines = request.cart_items.len()))]
pub async fn process_order(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<ProcessOrderRequest>,
) -> Result<Json<ProcessOrderResponse>> {
    let service = OrderService::new(state.db(), state.config().shipping, state.notifier());
    let PlacedOrder { order, order_items } = service
        .create_order(PlaceOrder {
            order_data: request.order_data,
            cart_items: request.cart_items,
            user_id: request.user_id,
            payment_intent_id: request.payment_intent_id,
        })
        .await?;

    if let Err(e) = update_cart(&SessionCartStore::new(session), CartAction::Clear).await {
        warn!(error = %e, order_number = %order.order_number, "Failed to clear session cart");
    }

    Ok(Json(ProcessOrderResponse {
        success: true,
        order,
        order_items,
    }))
}
