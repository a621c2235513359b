//! Identity and liveness handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::auth::{logout_url, Identity};
use crate::AppState;

/// Response for the /api/health endpoint
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe, served without authentication
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    /// The authenticated user's email or identifier
    pub user: String,
    /// How the user was authenticated
    pub auth_method: String,
    /// Where sign-out lives, when an Access team is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
}

/// Get the currently authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Json<MeResponse> {
    Json(MeResponse {
        user: identity.user,
        auth_method: identity.method.as_str().to_string(),
        logout_url: logout_url(&state.config.cf_access),
    })
}
