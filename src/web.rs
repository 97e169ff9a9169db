//! Browser surface: the login page, form login into a server-side session,
//! and the session-gated profile page.

use axum::{
    Form, Router,
    extract::State,
    http::header::SET_COOKIE,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::{AppState, check_credentials, me};
use crate::auth::{
    HasAuthBackend, HasSessionBackend, SESSION_COOKIE_NAME, require_session, session_cookie,
};
use crate::rate_limit::{LoginRateLimit, rate_limit_login};

/// Where a successful browser login lands.
pub const PROFILE_PATH: &str = "/user/profile";

/// Where the login form lives and posts to.
pub const LOGIN_PATH: &str = "/login";

const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sign in</title>
</head>
<body>
<form method="post" action="/login">
<label>Email <input type="email" name="email" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#;

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Create the browser router.
pub fn create_web_router(state: AppState, login_limit: Option<LoginRateLimit>) -> Router {
    // Only the credential check is rate limited, not the page itself
    let mut submit = post(login);
    if let Some(limit) = login_limit {
        submit = submit.route_layer(middleware::from_fn_with_state(limit, rate_limit_login));
    }
    let login_routes = Router::new().route(LOGIN_PATH, get(login_page).merge(submit));

    let session_routes = Router::new()
        .route(PROFILE_PATH, get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session::<AppState>,
        ));

    Router::new()
        .merge(login_routes)
        .merge(session_routes)
        .with_state(state)
}

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// Form login. Always answers with 303 so the browser follows up with a GET.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let Some(user) = check_credentials(state.db(), &form.email, &form.password).await? else {
        tracing::info!("Browser login rejected");
        return Ok(Redirect::to(&state.settings().login_path).into_response());
    };

    let previous = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string());
    let session_id = state.sessions().renew(previous.as_deref(), &user);

    tracing::info!(user_id = user.id, "Browser session started");
    Ok((
        [(SET_COOKIE, session_cookie(&session_id).to_string())],
        Redirect::to(PROFILE_PATH),
    )
        .into_response())
}
