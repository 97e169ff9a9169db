//! Rate limiting for credential login endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::IpAddr, num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Login attempt limiter shared by every credential endpoint.
#[derive(Clone)]
pub struct LoginRateLimit {
    limiter: Arc<IpLimiter>,
    trust_forwarded_for: bool,
}

impl LoginRateLimit {
    /// Allow `attempts` logins per minute per IP, all usable as a burst.
    pub fn per_minute(attempts: NonZeroU32, trust_forwarded_for: bool) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(attempts))),
            trust_forwarded_for,
        }
    }
}

/// Middleware for rate limiting login endpoints.
pub async fn rate_limit_login(
    State(config): State<LoginRateLimit>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(
        request.headers(),
        request.extensions(),
        config.trust_forwarded_for,
    ) {
        Ok(ip) => ip,
        Err(reason) => {
            tracing::warn!(reason, "Unable to determine client IP for login");
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    match config.limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::info!(ip = %ip, "Login rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many authentication attempts. Please wait before trying again.",
            )
                .into_response()
        }
    }
}
