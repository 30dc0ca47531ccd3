//! Admin API: authorization, order status notifications, CRUD.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use herbwell_core::{Category, OrderId, ProductId, UserId};
use herbwell_integration_tests::{
    RecordingMailer, TestContext, admin_token, product, request, token_for, with_bearer,
};
use herbwell_storefront::db::memory::tables;

async fn admin(ctx: &TestContext, method: Method, uri: &str, body: Option<&Value>) -> Value {
    let response = ctx
        .send(with_bearer(request(method, uri, body), &admin_token()))
        .await;
    assert!(
        response.status.is_success(),
        "{uri} returned {}: {}",
        response.status,
        response.body
    );
    response.body
}

async fn place_order(ctx: &TestContext) -> Value {
    let response = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": {
                    "fullName": "Mara Quinn",
                    "email": "mara@example.com",
                    "address": "12 Willow Lane",
                    "city": "Bristol",
                    "zipCode": "BS1 4DJ",
                    "country": "GB",
                },
                "cartItems": [{
                    "productId": ProductId::generate(),
                    "title": "Calm Tea",
                    "price": "6.50",
                    "category": "herbal_teas",
                    "slug": "calm-tea",
                    "quantity": 2,
                }],
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    response.body["order"].clone()
}

#[tokio::test]
async fn test_admin_routes_require_a_token() {
    let ctx = TestContext::new();
    let response = ctx.get("/api/admin/orders").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_customers() {
    let ctx = TestContext::new();
    let response = ctx
        .send(with_bearer(
            request(Method::GET, "/api/admin/users", None),
            &token_for(UserId::generate(), None),
        ))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let ctx = TestContext::new();
    let response = ctx
        .send(with_bearer(
            request(Method::GET, "/api/admin/orders", None),
            "not-a-jwt",
        ))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_list_joins_address_and_items() {
    let ctx = TestContext::new();
    place_order(&ctx).await;

    let orders = admin(&ctx, Method::GET, "/api/admin/orders", None).await;

    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["shippingAddress"]["city"], "Bristol");
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_change_emails_the_customer() {
    let ctx = TestContext::new();
    let order = place_order(&ctx).await;

    let updated = admin(
        &ctx,
        Method::PATCH,
        "/api/admin/orders",
        Some(&json!({"orderId": order["id"], "status": "shipped"})),
    )
    .await;
    assert_eq!(updated["success"], true);

    let emails = ctx.wait_for_emails(1).await;
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].recipient, "mara@example.com");
    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "mara@example.com");

    let audit = admin(
        &ctx,
        Method::GET,
        &format!("/api/admin/orders/{}/emails", order["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(audit.as_array().unwrap().len(), 1);
    assert_eq!(audit[0]["status"], "sent");
}

#[tokio::test]
async fn test_same_status_sends_nothing() {
    let ctx = TestContext::new();
    let order = place_order(&ctx).await;

    admin(
        &ctx,
        Method::PATCH,
        "/api/admin/orders",
        Some(&json!({"orderId": order["id"], "status": "pending"})),
    )
    .await;
    ctx.settle().await;

    assert!(ctx.db.emails().await.is_empty());
    assert!(ctx.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_the_update() {
    let ctx = TestContext::with_mailer(RecordingMailer::failing());
    let order = place_order(&ctx).await;

    let updated = admin(
        &ctx,
        Method::PATCH,
        "/api/admin/orders",
        Some(&json!({"orderId": order["id"], "status": "processing"})),
    )
    .await;
    assert_eq!(updated["success"], true);

    let emails = ctx.wait_for_emails(1).await;
    assert_eq!(emails.len(), 1);
    assert!(emails[0].error.is_some());
}

#[tokio::test]
async fn test_cancelling_marks_payment_failed() {
    let ctx = TestContext::new();
    let order = place_order(&ctx).await;

    admin(
        &ctx,
        Method::PATCH,
        "/api/admin/orders",
        Some(&json!({"orderId": order["id"], "status": "cancelled"})),
    )
    .await;

    let orders = admin(&ctx, Method::GET, "/api/admin/orders", None).await;
    assert_eq!(orders[0]["status"], "cancelled");
    assert_eq!(orders[0]["paymentStatus"], "failed");
}

#[tokio::test]
async fn test_paid_order_leaving_shipped_is_no_longer_paid() {
    let ctx = TestContext::new();
    let placed = ctx
        .post_json(
            "/api/process-order",
            &json!({
                "orderData": {
                    "fullName": "Mara Quinn",
                    "email": "mara@example.com",
                    "address": "12 Willow Lane",
                    "city": "Bristol",
                    "zipCode": "BS1 4DJ",
                    "country": "GB",
                    "paymentMethod": "card",
                },
                "cartItems": [{
                    "productId": ProductId::generate(),
                    "title": "Calm Tea",
                    "price": "6.50",
                    "category": "herbal_teas",
                    "slug": "calm-tea",
                    "quantity": 1,
                }],
                "paymentIntentId": "pi_789",
            }),
        )
        .await;
    let order = &placed.body["order"];
    assert_eq!(order["paymentStatus"], "paid");

    for status in ["shipped", "delivered"] {
        admin(
            &ctx,
            Method::PATCH,
            "/api/admin/orders",
            Some(&json!({"orderId": order["id"], "status": status})),
        )
        .await;
    }

    let orders = admin(&ctx, Method::GET, "/api/admin/orders", None).await;
    assert_eq!(orders[0]["status"], "delivered");
    assert_ne!(orders[0]["paymentStatus"], "paid");
    assert_eq!(orders[0]["paymentStatus"], "pending");
}

#[tokio::test]
async fn test_failed_status_write_is_a_server_error() {
    let ctx = TestContext::new();
    let order = place_order(&ctx).await;
    ctx.db.set_unavailable(tables::ORDERS, true).await;

    let response = ctx
        .send(with_bearer(
            request(
                Method::PATCH,
                "/api/admin/orders",
                Some(&json!({"orderId": order["id"], "status": "shipped"})),
            ),
            &admin_token(),
        ))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = response.body["error"].as_str().unwrap();
    assert!(error.contains("orders is offline"), "{error}");
    ctx.settle().await;
    assert!(ctx.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_unknown_order_status_update_is_not_found() {
    let ctx = TestContext::new();
    let response = ctx
        .send(with_bearer(
            request(
                Method::PATCH,
                "/api/admin/orders",
                Some(&json!({"orderId": OrderId::generate(), "status": "shipped"})),
            ),
            &admin_token(),
        ))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_carry_order_stats() {
    let ctx = TestContext::new();
    let user = UserId::generate();
    ctx.add_profile(user, "Ivy Hart", "ivy@example.com").await;

    let users = admin(&ctx, Method::GET, "/api/admin/users", None).await;

    assert_eq!(users[0]["id"], user.to_string());
    assert_eq!(users[0]["orderCount"], 0);
}

#[tokio::test]
async fn test_bundle_lifecycle() {
    let ctx = TestContext::new();
    let soap = product(Category::Soaps, "lavender-soap", 899, &[]);
    let input = json!({
        "name": "Calm Evening Set",
        "slug": "calm-evening-set",
        "price": "19.99",
        "items": [{"productId": soap.id, "category": "soaps", "quantity": 1}],
    });

    let created = admin(&ctx, Method::POST, "/api/admin/bundles", Some(&input)).await;
    let id = created["id"].as_str().unwrap().to_string();

    let public = ctx.get("/api/bundles/calm-evening-set").await;
    assert_eq!(public.status, StatusCode::OK);

    let mut hidden = input.clone();
    hidden["isActive"] = json!(false);
    let updated = admin(
        &ctx,
        Method::PUT,
        &format!("/api/admin/bundles/{id}"),
        Some(&hidden),
    )
    .await;
    assert_eq!(updated["isActive"], false);
    assert_eq!(
        ctx.get("/api/bundles/calm-evening-set").await.status,
        StatusCode::NOT_FOUND
    );

    admin(&ctx, Method::DELETE, &format!("/api/admin/bundles/{id}"), None).await;
    let gone = ctx
        .send(with_bearer(
            request(Method::GET, &format!("/api/admin/bundles/{id}"), None),
            &admin_token(),
        ))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bundle_without_items_is_rejected() {
    let ctx = TestContext::new();
    let response = ctx
        .send(with_bearer(
            request(
                Method::POST,
                "/api/admin/bundles",
                Some(&json!({"name": "Empty", "slug": "empty", "price": "5.00"})),
            ),
            &admin_token(),
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_moderation_resolves_product_names() {
    let ctx = TestContext::new();
    let soap = product(Category::Soaps, "lavender-soap", 899, &[]);
    let soap_id = soap.id;
    ctx.db.insert_product(soap).await;

    let created = ctx
        .send(with_bearer(
            request(
                Method::POST,
                "/api/reviews",
                Some(&json!({"productId": soap_id, "rating": 5, "productCategory": "soaps"})),
            ),
            &token_for(UserId::generate(), None),
        ))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let reviews = admin(&ctx, Method::GET, "/api/admin/reviews", None).await;
    assert_eq!(reviews[0]["productName"], "lavender soap");
    assert_eq!(reviews[0]["productSlug"], "lavender-soap");

    let id = reviews[0]["id"].as_str().unwrap().to_string();
    admin(&ctx, Method::DELETE, &format!("/api/admin/reviews/{id}"), None).await;
    let remaining = admin(&ctx, Method::GET, "/api/admin/reviews", None).await;
    assert_eq!(remaining, json!([]));
}
