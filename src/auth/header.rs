//! Bearer token extraction from the `Authorization` header.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::jwt::{AccessClaims, JwtConfig, VerifyError};

/// The only accepted scheme. Matched case-sensitively.
pub const BEARER_SCHEME: &str = "Bearer";

/// Why the `Authorization` header did not authenticate the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderAuthError {
    #[error("no authorization header")]
    NoHeader,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("unsupported authorization scheme")]
    UnsupportedScheme,
    #[error("invalid token")]
    InvalidToken,
    #[error("expired token")]
    ExpiredToken,
    #[error("token issued for another domain")]
    IssuerMismatch,
}

impl From<VerifyError> for HeaderAuthError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Expired => HeaderAuthError::ExpiredToken,
            VerifyError::IssuerMismatch => HeaderAuthError::IssuerMismatch,
            VerifyError::Malformed | VerifyError::AlgorithmMismatch => {
                HeaderAuthError::InvalidToken
            }
        }
    }
}

/// Extract and verify the bearer access token.
/// Returns the raw token together with its verified claims.
pub fn extract_bearer(
    headers: &HeaderMap,
    jwt: &JwtConfig,
) -> Result<(String, AccessClaims), HeaderAuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(HeaderAuthError::NoHeader)?
        .to_str()
        .map_err(|_| HeaderAuthError::MalformedHeader)?;

    if value.is_empty() {
        return Err(HeaderAuthError::NoHeader);
    }

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(HeaderAuthError::MalformedHeader);
    };

    if *scheme != BEARER_SCHEME {
        return Err(HeaderAuthError::UnsupportedScheme);
    }

    let claims = jwt.verify_access(token)?;
    Ok((token.to_string(), claims))
}
