//! Endpoints for on-box consumers (login helpers).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::aaa::radius::RadiusConfig;
use crate::api::auth::basic_credentials;
use crate::api::error::ApiError;
use crate::auth::AuthPolicy;
use crate::http::server::AppState;

use super::read;

#[derive(Debug, Serialize)]
pub struct AuthResult {
    pub authenticated: bool,
    pub privileged: bool,
}

pub async fn radius_enabled(State(state): State<AppState>) -> Json<bool> {
    Json(read::<RadiusConfig>(&state).enabled)
}

/// Check Basic credentials against RADIUS, with local fallback when the
/// live configuration allows it.
pub async fn radius_authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResult>, ApiError> {
    let (username, password) = basic_credentials(&headers).unwrap_or_default();
    let radius = read::<RadiusConfig>(&state);
    let policy = AuthPolicy {
        use_radius: true,
        allow_fallback: radius.fallback,
        require_privilege: true,
    };

    let outcome = state
        .authenticator
        .authenticate(policy, &radius, &username, &password)
        .await;
    if let Some(err) = outcome.errors.into_iter().next() {
        return Err(err.into());
    }
    Ok(Json(AuthResult {
        authenticated: outcome.authenticated,
        privileged: outcome.authorized,
    }))
}
