use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde_json::Value;

use crate::aaa::radius::{RadiusConfig, RadiusServer};
use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::http::server::AppState;

use super::{commit, read, split_names, NameList};

pub async fn get_radius(State(state): State<AppState>) -> Json<RadiusConfig> {
    Json(read(&state))
}

pub async fn patch_radius(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RadiusConfig>, ApiError> {
    let Json(patch) = payload?;
    super::patch(&state, &caller, patch).await
}

pub async fn get_enable(State(state): State<AppState>) -> Json<bool> {
    Json(read::<RadiusConfig>(&state).enabled)
}

pub async fn put_enable(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<bool>, JsonRejection>,
) -> Result<Json<RadiusConfig>, ApiError> {
    let Json(enabled) = payload?;
    commit(&state, &caller, move |radius: &mut RadiusConfig| {
        radius.enabled = enabled;
        Ok(())
    })
    .await
}

pub async fn get_fallback(State(state): State<AppState>) -> Json<bool> {
    Json(read::<RadiusConfig>(&state).fallback)
}

pub async fn put_fallback(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<bool>, JsonRejection>,
) -> Result<Json<RadiusConfig>, ApiError> {
    let Json(fallback) = payload?;
    commit(&state, &caller, move |radius: &mut RadiusConfig| {
        radius.fallback = fallback;
        Ok(())
    })
    .await
}

pub async fn get_servers(State(state): State<AppState>) -> Json<Vec<RadiusServer>> {
    Json(read::<RadiusConfig>(&state).servers)
}

pub async fn put_servers(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Vec<RadiusServer>>, JsonRejection>,
) -> Result<Json<RadiusConfig>, ApiError> {
    let Json(servers) = payload?;
    commit(&state, &caller, move |radius: &mut RadiusConfig| {
        radius.servers = servers;
        Ok(())
    })
    .await
}

pub async fn post_servers(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Vec<RadiusServer>>, JsonRejection>,
) -> Result<Json<RadiusConfig>, ApiError> {
    let Json(servers) = payload?;
    commit(&state, &caller, move |radius: &mut RadiusConfig| {
        radius.servers.extend(servers);
        Ok(())
    })
    .await
}

/// Without `?servers=` every server is removed.
pub async fn delete_servers(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<NameList>, QueryRejection>,
) -> Result<Json<RadiusConfig>, ApiError> {
    let Query(query) = query?;
    let names = split_names(query.servers.as_deref());
    commit(&state, &caller, move |radius: &mut RadiusConfig| {
        if names.is_empty() {
            radius.servers.clear();
            Ok(())
        } else {
            radius.remove_servers(&names)
        }
    })
    .await
}
