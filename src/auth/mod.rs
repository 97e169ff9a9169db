//! Dual-token authentication.
//!
//! Short-lived access tokens (15 min) travel in the `Authorization` header;
//! refresh tokens (24 h) travel in a hardened `__Host-` cookie and are rotated
//! on every refresh. Nothing is stored server-side for either token: validity
//! is signature plus expiry. Browser pages use an in-process session instead.

mod cookie;
mod errors;
mod gate;
mod header;
mod ip;
mod issuer;
mod refresh;
mod state;
mod types;

pub use cookie::{
    REFRESH_COOKIE_NAME, SESSION_COOKIE_NAME, expired_refresh_cookie, get_cookie, refresh_cookie,
    session_cookie,
};
pub use errors::{ApiAuthError, SessionRedirect};
pub use gate::{require_bearer, require_session};
pub use header::{BEARER_SCHEME, HeaderAuthError, extract_bearer};
pub use ip::extract_client_ip;
pub use issuer::{IssuedPair, TokenPair, issue_pair};
pub use refresh::{RefreshError, Renewed, renew};
pub use state::{AuthSettings, HasAuthBackend, HasSessionBackend};
pub use types::AuthContext;
