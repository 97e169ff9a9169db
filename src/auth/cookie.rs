//! Refresh and session cookie construction.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

/// Cookie name for the refresh token. The `__Host-` prefix requires Secure and Path=/.
pub const REFRESH_COOKIE_NAME: &str = "__Host-refresh_token";

/// Cookie name for the browser session id.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Session cookie lifetime, matching the server-side session expiry.
pub const SESSION_DURATION_SECS: i64 = 24 * 60 * 60;

/// Build the refresh cookie for a freshly signed token.
/// `expires_at` is the token's `exp` claim so the cookie never outlives the token.
pub fn refresh_cookie(
    token: &str,
    cookie_domain: Option<&str>,
    expires_at: u64,
) -> Cookie<'static> {
    let expires_at = i64::try_from(expires_at).unwrap_or(i64::MAX);
    let max_age = expires_at - OffsetDateTime::now_utc().unix_timestamp();

    let mut cookie = Cookie::build((REFRESH_COOKIE_NAME.to_string(), token.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age.max(0)))
        .expires(OffsetDateTime::from_unix_timestamp(expires_at).ok())
        .build();
    pin_domain(&mut cookie, cookie_domain);
    cookie
}

/// Build the logout cookie: same scope as the refresh cookie, empty value, expired at the epoch.
pub fn expired_refresh_cookie(cookie_domain: Option<&str>) -> Cookie<'static> {
    let mut cookie = Cookie::build((REFRESH_COOKIE_NAME.to_string(), String::new()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build();
    pin_domain(&mut cookie, cookie_domain);
    cookie
}

/// Browsers reject `__Host-` cookies that carry a Domain attribute.
/// Without a configured domain the cookie stays host-only.
fn pin_domain(cookie: &mut Cookie<'static>, cookie_domain: Option<&str>) {
    if let Some(domain) = cookie_domain.filter(|d| !d.is_empty()) {
        cookie.set_domain(domain.to_string());
    }
}

/// Build the browser session cookie.
pub fn session_cookie(session_id: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(SESSION_DURATION_SECS))
        .build()
}

/// Read a non-empty cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
