//! JWT token signing and validation.
//!
//! Both token kinds are signed with HS256 under a single secret. Access tokens
//! are bound to the service domain through `iss` and `aud`; refresh tokens
//! carry nothing but the subject and timestamps.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::User;

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 24 hours
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// Header algorithms accepted on verification. Signing always uses HS256.
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (principal id)
    pub sub: String,
    /// Display name, "first last"
    pub name: String,
    /// Audience (service domain)
    pub aud: String,
    /// Issuer (service domain)
    pub iss: String,
    pub admin: bool,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl AccessClaims {
    pub fn new(user: &User, domain: &str, issued_at: u64) -> Self {
        Self {
            sub: user.id.to_string(),
            name: user.display_name(),
            aud: domain.to_string(),
            iss: domain.to_string(),
            admin: user.is_admin,
            token_type: TokenType::Access,
            iat: issued_at,
            exp: issued_at + ACCESS_TOKEN_DURATION_SECS,
        }
    }

    /// Principal id carried in `sub`.
    pub fn subject_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// JWT claims for refresh tokens. No name or admin claim on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (principal id)
    pub sub: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp), also the time of the previous refresh
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl RefreshClaims {
    pub fn new(user_id: i64, issued_at: u64) -> Self {
        Self {
            sub: user_id.to_string(),
            token_type: TokenType::Refresh,
            iat: issued_at,
            exp: issued_at + REFRESH_TOKEN_DURATION_SECS,
        }
    }

    pub fn subject_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Signing key material plus the domain tokens are bound to.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    domain: String,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and service domain.
    pub fn new(secret: &[u8], domain: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Sign a claim set with HS256.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, SignError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(SignError::Encoding)
    }

    /// Validate and decode an access token, including issuer and audience.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, VerifyError> {
        let mut validation = base_validation();
        validation.set_issuer(&[self.domain.as_str()]);
        validation.set_audience(&[self.domain.as_str()]);

        let claims: AccessClaims = self.decode(token, &validation)?;
        if claims.token_type != TokenType::Access {
            return Err(VerifyError::Malformed);
        }
        Ok(claims)
    }

    /// Validate and decode a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, VerifyError> {
        let mut validation = base_validation();
        validation.validate_aud = false;

        let claims: RefreshClaims = self.decode(token, &validation)?;
        if claims.token_type != TokenType::Refresh {
            return Err(VerifyError::Malformed);
        }
        Ok(claims)
    }

    fn decode<C: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<C, VerifyError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| VerifyError::Malformed)?;
        if !HMAC_FAMILY.contains(&header.alg) {
            return Err(VerifyError::AlgorithmMismatch);
        }

        jsonwebtoken::decode::<C>(token, &self.decoding_key, validation)
            .map(|data| data.claims)
            .map_err(|e| VerifyError::from(&e))
    }
}

fn base_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = HMAC_FAMILY.to_vec();
    validation.leeway = 0;
    validation
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, SignError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| SignError::TimeError)
}

/// Errors while producing a token. These should never happen with a valid secret.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("system time error")]
    TimeError,
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,
    #[error("token issued for another domain")]
    IssuerMismatch,
    #[error("malformed token")]
    Malformed,
    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,
}

impl From<&jsonwebtoken::errors::Error> for VerifyError {
    fn from(e: &jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => VerifyError::IssuerMismatch,
            ErrorKind::InvalidAlgorithm => VerifyError::AlgorithmMismatch,
            _ => VerifyError::Malformed,
        }
    }
}
