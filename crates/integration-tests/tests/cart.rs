//! Session cart and wishlist.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use herbwell_core::Category;
use herbwell_integration_tests::{TestContext, dec, money, product, request, with_cookie};

#[tokio::test]
async fn test_cart_persists_across_requests_in_the_session() {
    let ctx = TestContext::new();
    let soap = product(Category::Soaps, "lavender-soap", 899, &[]);
    let soap_id = soap.id;
    ctx.db.insert_product(soap).await;

    let added = ctx
        .post_json(
            "/api/cart/items",
            &json!({"category": "soaps", "slug": "lavender-soap", "quantity": 2}),
        )
        .await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["itemCount"], 2);
    let cookie = added.session_cookie().expect("session cookie is set");

    let again = ctx
        .send(with_cookie(
            request(
                Method::POST,
                "/api/cart/items",
                Some(&json!({"category": "soaps", "slug": "lavender-soap"})),
            ),
            &cookie,
        ))
        .await;
    assert_eq!(again.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(again.body["itemCount"], 3);
    assert_eq!(money(&again.body["totalPrice"]), dec("26.97"));

    let updated = ctx
        .send(with_cookie(
            request(
                Method::PATCH,
                &format!("/api/cart/items/{soap_id}"),
                Some(&json!({"quantity": 0})),
            ),
            &cookie,
        ))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["items"], json!([]));

    let fresh = ctx.get("/api/cart").await;
    assert_eq!(fresh.body["itemCount"], 0);
}

#[tokio::test]
async fn test_adding_unknown_product_is_not_found() {
    let ctx = TestContext::new();
    let response = ctx
        .post_json(
            "/api/cart/items",
            &json!({"category": "soaps", "slug": "missing"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_cart_body_is_bad_request() {
    let ctx = TestContext::new();
    let response = ctx
        .post_json("/api/cart/items", &json!({"quantity": "two"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_panel_toggle() {
    let ctx = TestContext::new();
    let opened = ctx
        .post_json("/api/cart/panel", &json!({"action": "toggle"}))
        .await;
    assert_eq!(opened.body["isOpen"], true);
}

#[tokio::test]
async fn test_wishlist_toggle_adds_then_removes() {
    let ctx = TestContext::new();
    ctx.db
        .insert_product(product(Category::HerbalTeas, "calm-tea", 650, &[]))
        .await;
    let body = json!({"category": "herbal_teas", "slug": "calm-tea"});

    let added = ctx.post_json("/api/wishlist/toggle", &body).await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["items"].as_array().unwrap().len(), 1);
    let cookie = added.session_cookie().expect("session cookie is set");

    let removed = ctx
        .send(with_cookie(
            request(Method::POST, "/api/wishlist/toggle", Some(&body)),
            &cookie,
        ))
        .await;
    assert_eq!(removed.body["items"], json!([]));
}
