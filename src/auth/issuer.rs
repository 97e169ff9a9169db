//! Access/refresh token pair issuance.

use serde::Serialize;

use crate::db::User;
use crate::jwt::{AccessClaims, JwtConfig, RefreshClaims, SignError, unix_now};

/// Token pair returned by credential login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A freshly signed pair plus the refresh expiry the cookie must mirror.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub tokens: TokenPair,
    /// Refresh token expiration (Unix seconds)
    pub refresh_expires_at: u64,
}

/// Sign a new token pair for a user. Either both tokens are signed or neither is returned.
pub fn issue_pair(jwt: &JwtConfig, user: &User) -> Result<IssuedPair, SignError> {
    let now = unix_now()?;

    let access_claims = AccessClaims::new(user, jwt.domain(), now);
    let refresh_claims = RefreshClaims::new(user.id, now);

    let access_token = jwt.sign(&access_claims)?;
    let refresh_token = jwt.sign(&refresh_claims)?;

    Ok(IssuedPair {
        tokens: TokenPair {
            access_token,
            refresh_token,
        },
        refresh_expires_at: refresh_claims.exp,
    })
}
