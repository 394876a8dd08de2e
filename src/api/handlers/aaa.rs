use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::Value;

use crate::aaa::AaaConfig;
use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::http::server::AppState;

pub async fn get_aaa(State(state): State<AppState>) -> Json<AaaConfig> {
    Json(super::read(&state))
}

pub async fn patch_aaa(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AaaConfig>, ApiError> {
    let Json(patch) = payload?;
    super::patch(&state, &caller, patch).await
}
