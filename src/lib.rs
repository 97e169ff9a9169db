pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod web;

use api::{AppState, create_api_router};
use auth::AuthSettings;
use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::{HeaderValue, Method, header},
};
use db::Database;
use jwt::JwtConfig;
use rate_limit::LoginRateLimit;
use session::SessionStore;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowCredentials, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn};
use web::create_web_router;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Service domain, used as token issuer and audience
    pub domain: String,
    /// Domain the refresh cookie is pinned to. None keeps it host-only.
    pub cookie_domain: Option<String>,
    /// Browser origins allowed to make credentialed cross-origin calls. Empty disables CORS.
    pub allowed_origins: Vec<String>,
    /// Minimum age of a refresh token before it can be exchanged
    pub min_refresh_interval: Duration,
    /// Login page for unauthenticated browsers
    pub login_path: String,
    /// Login attempts allowed per minute per client IP. None disables the limit.
    pub login_rate_limit: Option<NonZeroU32>,
    /// Take the client IP from X-Forwarded-For (requires running behind a proxy)
    pub trust_forwarded_for: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let state = AppState {
        db: config.db.clone(),
        jwt: Arc::new(JwtConfig::new(&config.jwt_secret, config.domain.clone())),
        settings: Arc::new(AuthSettings {
            cookie_domain: config.cookie_domain.clone(),
            min_refresh_interval: config.min_refresh_interval,
            login_path: config.login_path.clone(),
        }),
        sessions: SessionStore::new(),
    };

    // One limiter shared by API and browser logins so the budget cannot be doubled
    let login_limit = config
        .login_rate_limit
        .map(|attempts| LoginRateLimit::per_minute(attempts, config.trust_forwarded_for));

    let mut app = Router::new()
        .merge(create_api_router(state.clone(), login_limit.clone()))
        .merge(create_web_router(state, login_limit));

    if let Some(cors) = cors_layer(&config.allowed_origins) {
        app = app.layer(cors);
    }

    app.layer(
        TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let matched_path = request
                .extensions()
                .get::<MatchedPath>()
                .map(MatchedPath::as_str);

            info_span!(
                "request",
                method = ?request.method(),
                matched_path,
            )
        }),
    )
}

/// CORS for the configured origins. Credentials are only allowed for a listed
/// `Origin`, so requests without one never see the credentials header.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid allowed origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    let credentialed = Arc::new(allowed.clone());
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(AllowCredentials::predicate(move |origin, _| {
                credentialed.contains(origin)
            })),
    )
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
