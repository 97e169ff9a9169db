//! Authentication context shared by the bearer and session gates.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::ApiAuthError;
use super::header::HeaderAuthError;
use crate::jwt::AccessClaims;
use crate::session::Session;

/// Who is making the request, independent of how they proved it.
/// Inserted into request extensions by the gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    principal_id: Option<i64>,
    name: String,
    admin: bool,
}

impl AuthContext {
    pub fn from_claims(claims: &AccessClaims) -> Self {
        Self {
            principal_id: claims.subject_id(),
            name: claims.name.clone(),
            admin: claims.admin,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self {
            principal_id: Some(session.principal_id),
            name: session.name.clone(),
            admin: session.admin,
        }
    }

    pub fn principal_id(&self) -> Option<i64> {
        self.principal_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

/// Only resolves behind one of the gates; anywhere else the request is unauthenticated.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(ApiAuthError::new(HeaderAuthError::NoHeader))
    }
}
