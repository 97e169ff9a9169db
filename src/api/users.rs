//! Protected user endpoints.

use axum::Json;
use serde::Serialize;

use crate::auth::AuthContext;

#[derive(Serialize)]
pub(crate) struct MeResponse {
    id: Option<i64>,
    name: String,
    admin: bool,
}

/// The caller's identity, whichever gate authenticated them.
pub(crate) async fn me(auth: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth.principal_id(),
        name: auth.name().to_string(),
        admin: auth.is_admin(),
    })
}
