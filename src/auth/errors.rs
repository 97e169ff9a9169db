//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use super::header::HeaderAuthError;

/// API authentication error. Always an opaque 401; the failing check is only logged.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: HeaderAuthError,
}

impl ApiAuthError {
    pub fn new(kind: HeaderAuthError) -> Self {
        Self { kind }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        tracing::debug!(reason = %self.kind, "Rejected bearer authentication");

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not authenticated",
            }),
        )
            .into_response()
    }
}

/// Session authentication error - redirects the browser to the login page.
#[derive(Debug)]
pub struct SessionRedirect {
    pub login_path: String,
}

impl IntoResponse for SessionRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary(&self.login_path).into_response()
    }
}
