//! Request gates for protected routes.
//!
//! Both gates insert an [`AuthContext`] into request extensions on success,
//! so handlers extract the same type whichever surface they are mounted on.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::VARY},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::cookie::{SESSION_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, SessionRedirect};
use super::header::extract_bearer;
use super::state::{HasAuthBackend, HasSessionBackend};
use super::types::AuthContext;

/// Bearer gate for the API surface. Rejects with an opaque 401.
pub async fn require_bearer<S>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
{
    let claims = match extract_bearer(request.headers(), state.jwt()) {
        Ok((_, claims)) => claims,
        Err(kind) => return ApiAuthError::new(kind).into_response(),
    };

    request
        .extensions_mut()
        .insert(AuthContext::from_claims(&claims));

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Session gate for the browser surface. Redirects to the login page when
/// the session cookie is missing or no longer maps to a live session.
pub async fn require_session<S>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: HasSessionBackend + Clone + Send + Sync + 'static,
{
    let session = get_cookie(request.headers(), SESSION_COOKIE_NAME)
        .and_then(|id| state.sessions().get(&id));

    let Some(session) = session else {
        return SessionRedirect {
            login_path: state.settings().login_path.clone(),
        }
        .into_response();
    };

    request
        .extensions_mut()
        .insert(AuthContext::from_session(&session));

    next.run(request).await
}
