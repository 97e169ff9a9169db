//! Tests for refresh token exchange and logout.
//!
//! Tests cover:
//! - Form and cookie refresh flows, with cookie rotation
//! - Expired, tampered and missing refresh tokens
//! - Claims re-derived from the current stored user
//! - Refresh throttling
//! - Logout always expires the refresh cookie

mod common;

use std::time::Duration;

use authgate::jwt::{RefreshClaims, unix_now};
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::Cookie;
use common::{
    DOMAIN, TestApp, TestOptions, body_json, create_test_app, create_test_app_with,
    find_set_cookie,
};
use time::OffsetDateTime;
use tower::ServiceExt;

const REFRESH_COOKIE: &str = "__Host-refresh_token";

fn refresh_token(t: &TestApp, issued_at: u64) -> String {
    t.jwt
        .sign(&RefreshClaims::new(t.admin_id, issued_at))
        .unwrap()
}

fn cookie_refresh_request(method: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/web/refresh-token");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{}={}", REFRESH_COOKIE, token));
    }
    builder.body(Body::empty()).unwrap()
}

fn form_refresh_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/refresh-token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn rotated_cookie(response: &axum::http::Response<Body>) -> Cookie<'static> {
    Cookie::parse(find_set_cookie(response, REFRESH_COOKIE).expect("no rotated cookie")).unwrap()
}

#[tokio::test]
async fn test_cookie_refresh_issues_access_token_and_rotates_cookie() {
    let t = create_test_app().await;
    let token = refresh_token(&t, unix_now().unwrap() - 5);

    for method in ["GET", "POST"] {
        let response = t
            .app
            .clone()
            .oneshot(cookie_refresh_request(method, Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", method);

        let cookie = rotated_cookie(&response);
        assert_ne!(cookie.value(), token);
        assert_eq!(cookie.domain(), Some(DOMAIN));
        let rotated = t.jwt.verify_refresh(cookie.value()).unwrap();
        assert_eq!(
            cookie.expires_datetime().unwrap().unix_timestamp(),
            rotated.exp as i64
        );

        let json = body_json(response).await;
        let access = t
            .jwt
            .verify_access(json["access_token"].as_str().unwrap())
            .unwrap();
        assert_eq!(access.sub, t.admin_id.to_string());
        assert!(json.get("refresh_token").is_none());
    }
}

#[tokio::test]
async fn test_form_refresh() {
    let t = create_test_app().await;
    let token = refresh_token(&t, unix_now().unwrap());

    let response = t
        .app
        .oneshot(form_refresh_request(&format!("refresh_token={}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(find_set_cookie(&response, REFRESH_COOKIE).is_some());
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
}

#[tokio::test]
async fn test_missing_refresh_token_is_unauthorized() {
    let t = create_test_app().await;

    let response = t
        .app
        .clone()
        .oneshot(cookie_refresh_request("POST", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for body in ["refresh_token=", ""] {
        let response = t
            .app
            .clone()
            .oneshot(form_refresh_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{:?}", body);
    }
}

#[tokio::test]
async fn test_expired_refresh_token_is_bad_request() {
    let t = create_test_app().await;
    // Expired one hour ago
    let token = refresh_token(&t, unix_now().unwrap() - 25 * 3600);

    let response = t
        .app
        .oneshot(cookie_refresh_request("POST", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(find_set_cookie(&response, REFRESH_COOKIE).is_none());
}

#[tokio::test]
async fn test_tampered_refresh_token_is_bad_request() {
    let t = create_test_app().await;
    let token = refresh_token(&t, unix_now().unwrap());

    for bad in [format!("{}x", token), "not.a.token".to_string()] {
        let response = t
            .app
            .clone()
            .oneshot(cookie_refresh_request("POST", Some(&bad)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let t = create_test_app().await;
    let user = t.db.users().get_by_id(t.admin_id).await.unwrap().unwrap();
    let access = authgate::auth::issue_pair(&t.jwt, &user)
        .unwrap()
        .tokens
        .access_token;

    let response = t
        .app
        .oneshot(cookie_refresh_request("POST", Some(&access)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_subject_is_unauthorized() {
    let t = create_test_app().await;
    let token = t
        .jwt
        .sign(&RefreshClaims::new(t.admin_id + 1000, unix_now().unwrap()))
        .unwrap();

    let response = t
        .app
        .oneshot(cookie_refresh_request("POST", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_reflects_current_admin_flag() {
    let t = create_test_app().await;
    let token = refresh_token(&t, unix_now().unwrap());

    t.db.users().set_admin(t.admin_id, false).await.unwrap();

    let response = t
        .app
        .oneshot(cookie_refresh_request("POST", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let access = t
        .jwt
        .verify_access(json["access_token"].as_str().unwrap())
        .unwrap();
    assert!(!access.admin);
}

#[tokio::test]
async fn test_back_to_back_refresh_is_too_early() {
    let t = create_test_app_with(TestOptions {
        min_refresh_interval: Duration::from_secs(1),
        ..TestOptions::default()
    })
    .await;
    let token = refresh_token(&t, unix_now().unwrap() - 5);

    let response = t
        .app
        .clone()
        .oneshot(cookie_refresh_request("POST", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = rotated_cookie(&response);

    let response = t
        .app
        .oneshot(cookie_refresh_request("POST", Some(rotated.value())))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 425);
}

#[tokio::test]
async fn test_logout_expires_refresh_cookie() {
    let t = create_test_app().await;
    let token = refresh_token(&t, unix_now().unwrap());

    for (method, cookie) in [
        ("POST", Some(token.as_str())),
        ("GET", Some(token.as_str())),
        ("POST", None),
    ] {
        let mut builder = Request::builder().method(method).uri("/web/logout");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("{}={}", REFRESH_COOKIE, cookie));
        }
        let response = t
            .app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let set_cookie = find_set_cookie(&response, REFRESH_COOKIE).unwrap();
        assert!(set_cookie.contains("Max-Age=0"), "{}", set_cookie);

        let cleared = Cookie::parse(set_cookie).unwrap();
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.path(), Some("/"));
        assert_eq!(cleared.domain(), Some(DOMAIN));
        assert!(cleared.expires_datetime().unwrap() < OffsetDateTime::now_utc());
    }
}

#[tokio::test]
async fn test_form_refresh_rejects_non_form_body_as_bad_request() {
    let t = create_test_app().await;
    let token = refresh_token(&t, unix_now().unwrap() - 5);

    for content_type in [Some("application/json"), Some("text/plain"), None] {
        let mut builder = Request::builder().method("POST").uri("/refresh-token");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let body = serde_json::json!({ "refresh_token": token }).to_string();
        let response = t
            .app
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{:?}",
            content_type
        );
        assert!(find_set_cookie(&response, REFRESH_COOKIE).is_none());
        let json = body_json(response).await;
        assert!(json["error"].is_string(), "{}", json);
    }
}

#[tokio::test]
async fn test_refresh_cookie_is_host_only_without_cookie_domain() {
    let t = create_test_app_with(TestOptions {
        cookie_domain: None,
        ..TestOptions::default()
    })
    .await;
    let token = refresh_token(&t, unix_now().unwrap() - 5);

    let response = t
        .app
        .clone()
        .oneshot(cookie_refresh_request("POST", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = find_set_cookie(&response, REFRESH_COOKIE).unwrap();
    assert!(!set_cookie.contains("Domain"), "{}", set_cookie);
    assert_eq!(rotated_cookie(&response).domain(), None);

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/web/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cleared = find_set_cookie(&response, REFRESH_COOKIE).unwrap();
    assert!(!cleared.contains("Domain"), "{}", cleared);
}
