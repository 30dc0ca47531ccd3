//! Order placement.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use herbwell_core::{Category, ProductId};
use herbwell_integration_tests::{TestContext, dec, money, product, request, with_cookie};
use herbwell_storefront::db::memory::tables;

fn line(price: &str, quantity: u32) -> Value {
    json!({
        "productId": ProductId::generate(),
        "title": "Lavender Soap",
        "price": price,
        "category": "soaps",
        "slug": "lavender-soap",
        "quantity": quantity,
    })
}

fn order_data(payment_method: &str) -> Value {
    json!({
        "fullName": "Mara Quinn",
        "email": "mara@example.com",
        "address": "12 Willow Lane",
        "city": "Bristol",
        "zipCode": "BS1 4DJ",
        "country": "GB",
        "paymentMethod": payment_method,
    })
}

#[tokio::test]
async fn test_order_below_threshold_pays_flat_shipping() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": order_data("cash_on_delivery"),
                "cartItems": [line("17.00", 2)],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let order = &response.body["order"];
    assert_eq!(money(&order["subtotal"]), dec("34.00"));
    assert_eq!(money(&order["shippingCost"]), dec("4.99"));
    assert_eq!(money(&order["total"]), dec("38.99"));
    assert_eq!(order["status"], "pending");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("HW"));
    assert_eq!(response.body["orderItems"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_over_threshold_ships_free() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": order_data("cash_on_delivery"),
                "cartItems": [line("25.00", 1), line("30.00", 1)],
            }),
        )
        .await;

    let order = &response.body["order"];
    assert_eq!(money(&order["shippingCost"]), dec("0"));
    assert_eq!(money(&order["total"]), dec("55.00"));
}

#[tokio::test]
async fn test_cash_on_delivery_is_never_paid() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": order_data("cash_on_delivery"),
                "cartItems": [line("12.00", 1)],
                "paymentIntentId": "pi_123",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["order"]["paymentMethod"], "cash_on_delivery");
    assert_eq!(response.body["order"]["paymentStatus"], "pending");
}

#[tokio::test]
async fn test_card_with_intent_is_paid() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": order_data("card"),
                "cartItems": [line("12.00", 1)],
                "paymentIntentId": "pi_456",
            }),
        )
        .await;

    assert_eq!(response.body["order"]["paymentStatus"], "paid");
    assert_eq!(response.body["order"]["paymentIntentId"], "pi_456");
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({"orderData": order_data("cash_on_delivery"), "cartItems": []}),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_overflowing_price_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": order_data("cash_on_delivery"),
                "cartItems": [line("79228162514264337593543950335", 2)],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "order total is too large");
}

#[tokio::test]
async fn test_failed_order_write_is_a_server_error() {
    let ctx = TestContext::new();
    ctx.db.set_unavailable(tables::ORDER_ITEMS, true).await;

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": order_data("cash_on_delivery"),
                "cartItems": [line("12.00", 1)],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = response.body["error"].as_str().unwrap();
    assert!(error.contains("order_items is offline"), "{error}");
}

#[tokio::test]
async fn test_missing_address_fields_are_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": {"fullName": "Mara Quinn"},
                "cartItems": [line("12.00", 1)],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_clears_the_session_cart() {
    let ctx = TestContext::new();
    ctx.db
        .insert_product(product(Category::Soaps, "lavender-soap", 899, &[]))
        .await;

    let added = ctx
        .post_json(
            "/api/cart/items",
            &json!({"category": "soaps", "slug": "lavender-soap"}),
        )
        .await;
    let cookie = added.session_cookie().expect("session cookie is set");

    let placed = ctx
        .send(with_cookie(
            request(
                Method::POST,
                "/api/process-order",
                Some(&json!({
                    "orderData": order_data("cash_on_delivery"),
                    "cartItems": added.body["items"],
                })),
            ),
            &cookie,
        ))
        .await;
    assert_eq!(placed.status, StatusCode::OK);

    let cart = ctx
        .send(with_cookie(request(Method::GET, "/api/cart", None), &cookie))
        .await;
    assert_eq!(cart.body["itemCount"], 0);
}
