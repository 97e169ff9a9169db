#![allow(dead_code)]

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use authgate::{
    ServerConfig, create_app,
    db::{Database, NewUser},
    jwt::JwtConfig,
};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, header},
};
use serde_json::Value;

pub const DOMAIN: &str = "example.com";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "secret";
pub const ALLOWED_ORIGIN: &str = "https://app.example.com";

/// A router over an in-memory database seeded with one admin user.
pub struct TestApp {
    pub app: axum::Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub admin_id: i64,
}

pub struct TestOptions {
    pub min_refresh_interval: Duration,
    pub login_rate_limit: Option<NonZeroU32>,
    pub cookie_domain: Option<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            min_refresh_interval: Duration::ZERO,
            login_rate_limit: None,
            cookie_domain: Some(DOMAIN.to_string()),
        }
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(TestOptions::default()).await
}

pub async fn create_test_app_with(options: TestOptions) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    // Low bcrypt cost keeps the tests fast
    let password_hash = bcrypt::hash(ADMIN_PASSWORD, 4).expect("Failed to hash password");
    let admin_id = db
        .users()
        .create(&NewUser {
            first_name: "Admin",
            last_name: "User",
            email: ADMIN_EMAIL,
            password_hash: &password_hash,
            is_admin: true,
        })
        .await
        .expect("Failed to seed admin");

    let jwt_secret = b"test-jwt-secret-that-is-long-enough".to_vec();
    let jwt = JwtConfig::new(&jwt_secret, DOMAIN);
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret,
        domain: DOMAIN.to_string(),
        cookie_domain: options.cookie_domain,
        allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
        min_refresh_interval: options.min_refresh_interval,
        login_path: "/login".to_string(),
        login_rate_limit: options.login_rate_limit,
        trust_forwarded_for: false,
    };

    TestApp {
        app: create_app(&config),
        db,
        jwt,
        admin_id,
    }
}

/// Attach a peer address the way `into_make_service_with_connect_info` would.
pub fn with_peer(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    with_peer(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        [127, 0, 0, 1],
    )
}

pub fn login_body(email: &str, password: &str) -> String {
    serde_json::json!({ "email": email, "password": password }).to_string()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Find the Set-Cookie header for the given cookie name.
pub fn find_set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    extract_set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
