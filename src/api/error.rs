//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::auth::RefreshError;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
    fn fatal_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
    fn fatal_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::fatal(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    TooEarly(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Authentication failure. The message is fixed so the failing check is never revealed.
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Not authenticated".into())
    }

    pub fn too_early(msg: impl Into<String>) -> Self {
        Self::TooEarly(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("Database error".into())
    }

    pub fn fatal(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("Internal error".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TooEarly(_) => too_early_status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 425 Too Early.
pub fn too_early_status() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::TOO_MANY_REQUESTS)
}

impl From<RefreshError> for ApiError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::Unauthorized => ApiError::unauthorized(),
            RefreshError::BadRequest => ApiError::bad_request("Invalid refresh token"),
            RefreshError::TooEarly => ApiError::too_early("Refresh attempted too early"),
            RefreshError::Fatal => ApiError::internal("Internal error"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::TooEarly(msg)
            | ApiError::Internal(msg) => msg,
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_error_status_mapping() {
        for (e, status) in [
            (RefreshError::Unauthorized, StatusCode::UNAUTHORIZED),
            (RefreshError::BadRequest, StatusCode::BAD_REQUEST),
            (RefreshError::TooEarly, too_early_status()),
            (RefreshError::Fatal, StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            assert_eq!(ApiError::from(e).into_response().status(), status);
        }
        assert_eq!(too_early_status().as_u16(), 425);
    }
}
