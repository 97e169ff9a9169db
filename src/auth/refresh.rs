//! Refresh token exchange.
//!
//! A presented refresh token is verified, its subject re-resolved against the
//! user store, and a brand-new pair is issued from the current stored user so
//! claim changes (admin flag, name) take effect on the next refresh. The
//! refresh token is rotated on every success; its `iat` therefore marks the
//! previous refresh of the same flow, which is what the throttle checks.

use axum_extra::extract::cookie::Cookie;
use tracing::error;

use super::cookie::refresh_cookie;
use super::issuer::issue_pair;
use super::state::HasAuthBackend;
use crate::jwt::unix_now;

/// Why a refresh attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// No token presented, or its subject no longer resolves
    #[error("not authenticated")]
    Unauthorized,
    /// Token is malformed, tampered, or expired
    #[error("invalid refresh token")]
    BadRequest,
    /// Token was issued less than the minimum refresh interval ago
    #[error("refresh attempted too early")]
    TooEarly,
    #[error("internal error")]
    Fatal,
}

/// A successful refresh: the new access token and the rotated refresh cookie.
#[derive(Debug)]
pub struct Renewed {
    pub access_token: String,
    pub cookie: Cookie<'static>,
}

/// Exchange a refresh token for a new access token and rotated refresh cookie.
pub async fn renew<S>(state: &S, token: Option<&str>) -> Result<Renewed, RefreshError>
where
    S: HasAuthBackend,
{
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(RefreshError::Unauthorized)?;

    let claims = state
        .jwt()
        .verify_refresh(token)
        .map_err(|_| RefreshError::BadRequest)?;

    let user_id = claims.subject_id().ok_or(RefreshError::Unauthorized)?;

    let user = state
        .db()
        .users()
        .get_by_id(user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to get user for refresh");
            RefreshError::Fatal
        })?
        .ok_or(RefreshError::Unauthorized)?;

    let now = unix_now().map_err(|e| {
        error!(error = %e, "Failed to read clock");
        RefreshError::Fatal
    })?;
    let interval = state.settings().min_refresh_interval.as_secs();
    if now < claims.iat.saturating_add(interval) {
        return Err(RefreshError::TooEarly);
    }

    let issued = issue_pair(state.jwt(), &user).map_err(|e| {
        error!(error = %e, "Failed to sign refreshed tokens");
        RefreshError::Fatal
    })?;

    let cookie = refresh_cookie(
        &issued.tokens.refresh_token,
        state.settings().cookie_domain.as_deref(),
        issued.refresh_expires_at,
    );

    Ok(Renewed {
        access_token: issued.tokens.access_token,
        cookie,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::auth::AuthSettings;
    use crate::db::{Database, NewUser};
    use crate::jwt::{JwtConfig, RefreshClaims};

    #[derive(Clone)]
    struct TestState {
        db: Database,
        jwt: Arc<JwtConfig>,
        settings: Arc<AuthSettings>,
    }

    crate::impl_has_auth_backend!(TestState);

    async fn state(min_refresh_interval: Duration) -> (TestState, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&NewUser {
                first_name: "Admin",
                last_name: "User",
                email: "admin@example.com",
                password_hash: "unused",
                is_admin: false,
            })
            .await
            .unwrap();

        let state = TestState {
            db,
            jwt: Arc::new(JwtConfig::new(b"refresh-secret", "example.com")),
            settings: Arc::new(AuthSettings {
                cookie_domain: Some("example.com".to_string()),
                min_refresh_interval,
                login_path: "/login".to_string(),
            }),
        };
        (state, id)
    }

    fn refresh_token(state: &TestState, sub: &str, iat: u64) -> String {
        let mut claims = RefreshClaims::new(0, iat);
        claims.sub = sub.to_string();
        state.jwt.sign(&claims).unwrap()
    }

    #[tokio::test]
    async fn test_renew_issues_access_token_for_current_user() {
        let (state, id) = state(Duration::ZERO).await;
        let token = refresh_token(&state, &id.to_string(), unix_now().unwrap());

        state.db.users().set_admin(id, true).await.unwrap();
        let renewed = renew(&state, Some(&token)).await.unwrap();

        let claims = state.jwt.verify_access(&renewed.access_token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert!(claims.admin);

        let rotated = state.jwt.verify_refresh(renewed.cookie.value()).unwrap();
        assert_eq!(rotated.sub, id.to_string());
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (state, _) = state(Duration::ZERO).await;

        assert_eq!(
            renew(&state, None).await.unwrap_err(),
            RefreshError::Unauthorized
        );
        assert_eq!(
            renew(&state, Some("")).await.unwrap_err(),
            RefreshError::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_bad_tokens_are_bad_request() {
        let (state, id) = state(Duration::ZERO).await;
        let expired = refresh_token(&state, &id.to_string(), unix_now().unwrap() - 25 * 3600);

        assert_eq!(
            renew(&state, Some("garbage")).await.unwrap_err(),
            RefreshError::BadRequest
        );
        assert_eq!(
            renew(&state, Some(&expired)).await.unwrap_err(),
            RefreshError::BadRequest
        );
    }

    #[tokio::test]
    async fn test_unknown_subject_is_unauthorized() {
        let (state, id) = state(Duration::ZERO).await;
        let now = unix_now().unwrap();

        for sub in [(id + 1).to_string(), "not-a-number".to_string()] {
            let token = refresh_token(&state, &sub, now);
            assert_eq!(
                renew(&state, Some(&token)).await.unwrap_err(),
                RefreshError::Unauthorized,
                "{}",
                sub
            );
        }
    }

    #[tokio::test]
    async fn test_throttle() {
        let (state, id) = state(Duration::from_secs(60)).await;
        let now = unix_now().unwrap();

        let fresh = refresh_token(&state, &id.to_string(), now);
        assert_eq!(
            renew(&state, Some(&fresh)).await.unwrap_err(),
            RefreshError::TooEarly
        );

        let aged = refresh_token(&state, &id.to_string(), now - 61);
        let renewed = renew(&state, Some(&aged)).await.unwrap();

        assert_eq!(
            renew(&state, Some(renewed.cookie.value())).await.unwrap_err(),
            RefreshError::TooEarly
        );
    }
}
