mod auth;
pub mod error;
mod users;

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::auth::{AuthSettings, HasSessionBackend, require_bearer};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::{LoginRateLimit, rate_limit_login};
use crate::session::SessionStore;

pub(crate) use auth::check_credentials;
pub(crate) use users::me;

/// State shared by the API and browser routers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub settings: Arc<AuthSettings>,
    pub sessions: SessionStore,
}

crate::impl_has_auth_backend!(AppState);

impl HasSessionBackend for AppState {
    fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

/// Create the API router. `login_limit` throttles the credential endpoints when set.
pub fn create_api_router(state: AppState, login_limit: Option<LoginRateLimit>) -> Router {
    let mut login_routes = Router::new()
        .route("/auth", post(auth::login))
        .route("/web/auth", post(auth::web_login));
    if let Some(limit) = login_limit {
        login_routes =
            login_routes.route_layer(middleware::from_fn_with_state(limit, rate_limit_login));
    }

    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer::<AppState>,
        ));

    Router::new()
        .route("/greeting", get(greeting))
        .route("/refresh-token", post(auth::refresh_from_form))
        .route(
            "/web/refresh-token",
            get(auth::refresh_from_cookie).post(auth::refresh_from_cookie),
        )
        .route("/web/logout", get(auth::logout).post(auth::logout))
        .merge(login_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn greeting() -> Json<Value> {
    Json(json!({ "message": "hello world" }))
}
