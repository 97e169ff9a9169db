//! Token API endpoints.
//!
//! - POST `/auth` - Credential login, returns both tokens in the body
//! - POST `/web/auth` - Credential login, refresh token set as a cookie
//! - POST `/refresh-token` - Exchange a form-posted refresh token
//! - GET/POST `/web/refresh-token` - Exchange the refresh cookie
//! - GET/POST `/web/logout` - Clear the refresh cookie

use axum::{
    Form, Json,
    body::Bytes,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiError, ResultExt};
use crate::auth::{
    HasAuthBackend, REFRESH_COOKIE_NAME, TokenPair, expired_refresh_cookie, issue_pair,
    refresh_cookie, renew,
};
use crate::db::{Database, User};
use crate::password::{DUMMY_HASH, verify_password};

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub(crate) struct RefreshForm {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Serialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Check credentials against the user store.
/// `Ok(None)` covers every credential failure so callers cannot tell them apart.
/// Unknown emails are checked against a dummy hash so they cost the same bcrypt work.
pub(crate) async fn check_credentials(
    db: &Database,
    email: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    if email.is_empty() || password.is_empty() {
        return Ok(None);
    }

    let user = db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to get user")?;

    let hash = user
        .as_ref()
        .map_or(DUMMY_HASH, |u| u.password_hash.as_str())
        .to_string();
    let verified = verify_password(password.to_string(), hash)
        .await
        .fatal_err("Failed to verify password")?;

    Ok(user.filter(|_| verified))
}

/// Parse a JSON login body and authenticate it. Unparseable JSON is an auth failure.
async fn authenticate(state: &AppState, body: &[u8]) -> Result<User, ApiError> {
    let request: LoginRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::unauthorized())?;

    check_credentials(state.db(), &request.email, &request.password)
        .await?
        .ok_or_else(|| {
            tracing::info!("Credential login rejected");
            ApiError::unauthorized()
        })
}

pub(super) async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenPair>, ApiError> {
    let user = authenticate(&state, &body).await?;
    let issued = issue_pair(state.jwt(), &user).fatal_err("Failed to sign tokens")?;

    tracing::info!(user_id = user.id, "Issued token pair");
    Ok(Json(issued.tokens))
}

pub(super) async fn web_login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state, &body).await?;
    let issued = issue_pair(state.jwt(), &user).fatal_err("Failed to sign tokens")?;

    let cookie = refresh_cookie(
        &issued.tokens.refresh_token,
        state.settings().cookie_domain.as_deref(),
        issued.refresh_expires_at,
    );

    tracing::info!(user_id = user.id, "Issued token pair with refresh cookie");
    Ok((
        [(SET_COOKIE, cookie.to_string())],
        Json(AccessTokenResponse {
            access_token: issued.tokens.access_token,
        }),
    ))
}

/// A body that is not a urlencoded form is a bad request, reported in the API's JSON error shape.
pub(super) async fn refresh_from_form(
    State(state): State<AppState>,
    form: Result<Form<RefreshForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(form) = form.map_err(|e| {
        tracing::debug!(error = %e, "Rejected refresh form");
        ApiError::bad_request("Invalid form body")
    })?;
    let renewed = renew(&state, Some(&form.refresh_token)).await?;

    Ok((
        [(SET_COOKIE, renewed.cookie.to_string())],
        Json(AccessTokenResponse {
            access_token: renewed.access_token,
        }),
    ))
}

pub(super) async fn refresh_from_cookie(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let token = jar.get(REFRESH_COOKIE_NAME).map(|c| c.value().to_string());
    let renewed = renew(&state, token.as_deref()).await?;

    Ok((
        [(SET_COOKIE, renewed.cookie.to_string())],
        Json(AccessTokenResponse {
            access_token: renewed.access_token,
        }),
    ))
}

/// Clear the refresh cookie. Succeeds whether or not one was presented.
pub(super) async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = expired_refresh_cookie(state.settings().cookie_domain.as_deref());
    (StatusCode::ACCEPTED, [(SET_COOKIE, cookie.to_string())])
}
