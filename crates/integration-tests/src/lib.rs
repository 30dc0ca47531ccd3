//! Integration tests for Herbwell.
//!
//! The full router from [`herbwell_storefront::app`] runs in-process against
//! [`MemoryDatabase`] and an in-memory session store, so `cargo test -p
//! herbwell-integration-tests` needs no database or SMTP server.
//!
//! # Test Categories
//!
//! - `catalog` - category listings, badge views, bundles
//! - `cart` - session cart and wishlist
//! - `checkout` - order placement and payment rules
//! - `reviews` - submission, listing, averages
//! - `admin` - authorization, order status notifications, CRUD

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use herbwell_core::{Category, Email, ProductId, ShippingPolicy, UserId};
use herbwell_storefront::config::StorefrontConfig;
use herbwell_storefront::db::MemoryDatabase;
use herbwell_storefront::middleware::auth::{ADMIN_ROLE, AppMetadata, Claims};
use herbwell_storefront::models::{EmailLogEntry, Product, ProductDetails, Profile};
use herbwell_storefront::services::email::{EmailError, Mailer, OrderStatusEmail};
use herbwell_storefront::{AppState, app};

/// HS256 secret shared by the test config and [`token_for`].
pub const JWT_SECRET: &str = "q8Vt3Zr6Lm1Xc9Pw4Kd7Hs2Nb5Jf0Ga";

/// Mail sent through [`RecordingMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
}

/// Mailer that records deliveries, or fails every one.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl RecordingMailer {
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_order_status(
        &self,
        to: &Email,
        email: &OrderStatusEmail,
    ) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Delivery("relay refused connection".to_string()));
        }
        self.sent.lock().await.push(SentMail {
            to: to.to_string(),
            subject: email.subject(),
        });
        Ok(())
    }
}

/// A response with its body decoded as JSON (or a JSON string for text).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` pair of the session cookie, if one was set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|cookie| cookie.starts_with("hw_session="))
            .and_then(|cookie| cookie.split(';').next())
            .map(str::to_owned)
    }
}

/// One storefront instance with its backing stores.
pub struct TestContext {
    pub db: Arc<MemoryDatabase>,
    pub mailer: Arc<RecordingMailer>,
    app: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    #[must_use]
    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let mailer = Arc::new(mailer);
        let state = AppState::new(test_config(), db.clone(), mailer.clone());
        Self {
            db,
            mailer,
            app: app(state, MemoryStore::default()),
        }
    }

    /// Send a request through the full middleware stack.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(request(Method::GET, uri, None)).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(request(Method::POST, uri, Some(body))).await
    }

    /// Wait until `count` audit rows exist, or give up after a second.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<EmailLogEntry> {
        for _ in 0..100 {
            let emails = self.db.emails().await;
            if emails.len() >= count {
                return emails;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.db.emails().await
    }

    /// Let spawned notification tasks run.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    pub async fn add_profile(&self, id: UserId, name: &str, email: &str) {
        self.db
            .insert_profile(Profile {
                id,
                full_name: Some(name.to_string()),
                email: Some(email.to_string()),
                created_at: Utc::now(),
            })
            .await;
    }
}

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: None,
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        jwt_secret: SecretString::from(JWT_SECRET),
        shipping: ShippingPolicy::default(),
        catalog_cache_ttl: Duration::from_secs(60),
        rate_limit: false,
        email: None,
        sentry_dsn: None,
        sentry_environment: "test".to_string(),
    }
}

/// Build a request with an optional JSON body.
///
/// # Panics
///
/// Panics on an invalid URI.
#[must_use]
pub fn request(method: Method, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request")
}

/// Attach a bearer token.
///
/// # Panics
///
/// Panics if the token is not a valid header value.
#[must_use]
pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid token header"),
    );
    request
}

/// Attach a session cookie from [`TestResponse::session_cookie`].
///
/// # Panics
///
/// Panics if the cookie is not a valid header value.
#[must_use]
pub fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::COOKIE,
        HeaderValue::from_str(cookie).expect("valid cookie header"),
    );
    request
}

/// Mint a token the storefront accepts.
///
/// # Panics
///
/// Panics if encoding fails.
#[must_use]
pub fn token_for(user: UserId, role: Option<&str>) -> String {
    let exp = u64::try_from(Utc::now().timestamp()).unwrap_or_default() + 3600;
    let claims = Claims {
        sub: user,
        email: Some(format!("{user}@example.com")),
        exp,
        app_metadata: AppMetadata {
            role: role.map(str::to_owned),
        },
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

#[must_use]
pub fn admin_token() -> String {
    token_for(UserId::generate(), Some(ADMIN_ROLE))
}

/// A product with empty category attributes.
#[must_use]
pub fn product(category: Category, slug: &str, price_cents: i64, badges: &[&str]) -> Product {
    Product {
        id: ProductId::generate(),
        title: slug.replace('-', " "),
        slug: slug.to_string(),
        description: None,
        price: Decimal::new(price_cents, 2),
        image_url: None,
        stock_quantity: 10,
        in_stock: true,
        tags: Vec::new(),
        badges: badges.iter().map(|b| (*b).to_string()).collect(),
        created_at: Utc::now(),
        details: ProductDetails::empty(category),
    }
}

/// Parse a decimal money field from a JSON body.
///
/// # Panics
///
/// Panics if the field is missing or not a decimal.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a money value, got {other}"),
    }
}

/// Parse a decimal literal.
///
/// # Panics
///
/// Panics if `raw` is not a decimal.
#[must_use]
pub fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal literal")
}
