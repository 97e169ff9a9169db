//! Authentication state traits and macro.

use std::time::Duration;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::session::SessionStore;

/// Settings shared by the refresh protocol and the session gate.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Domain the refresh cookie is pinned to. None keeps it host-only.
    pub cookie_domain: Option<String>,
    /// Minimum age of a refresh token before it may be exchanged. Zero disables the throttle.
    pub min_refresh_interval: Duration,
    /// Where the session gate redirects unauthenticated browsers
    pub login_path: String,
}

/// Trait for state types that provide database and JWT access for authentication.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    fn settings(&self) -> &AuthSettings;
}

/// Trait for state types that support session authentication.
pub trait HasSessionBackend: HasAuthBackend {
    fn sessions(&self) -> &SessionStore;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `db: Database`
/// - `settings: Arc<AuthSettings>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub jwt: Arc<JwtConfig>,
///     pub settings: Arc<AuthSettings>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn settings(&self) -> &$crate::auth::AuthSettings {
                &self.settings
            }
        }
    };
}
