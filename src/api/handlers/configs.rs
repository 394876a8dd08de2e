//! Whole-tree endpoints: running, startup and default configurations.

use std::path::PathBuf;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aaa::AaaConfig;
use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::api::patch::apply_patch;
use crate::engine::{ApplianceConfig, ConfigStorage, StorageError};
use crate::error::Error;
use crate::http::server::AppState;
use crate::section::Section;
use crate::tasks::TaskStatus;

pub async fn get_running(State(state): State<AppState>) -> Json<ApplianceConfig> {
    Json((*state.engine.snapshot()).clone())
}

pub async fn patch_running(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApplianceConfig>, ApiError> {
    let Json(patch) = payload?;
    super::patch(&state, &caller, patch).await
}

pub async fn get_startup(State(state): State<AppState>) -> Result<Json<ApplianceConfig>, ApiError> {
    match state.engine.storage().load_startup()? {
        Some(tree) => Ok(Json(tree)),
        None => Err(Error::NotFound("startup".into()).into()),
    }
}

pub async fn get_default(State(state): State<AppState>) -> Result<Json<ApplianceConfig>, ApiError> {
    Ok(Json(state.engine.storage().load_default()?))
}

/// Load, merge, verify, persist. The host is not touched.
fn patch_stored<L, S>(
    state: &AppState,
    caller: &Caller,
    patch: &Value,
    load: L,
    store: S,
) -> Result<ApplianceConfig, ApiError>
where
    L: FnOnce(&ConfigStorage) -> Result<ApplianceConfig, StorageError>,
    S: FnOnce(&ConfigStorage, &ApplianceConfig) -> Result<(), StorageError>,
{
    let _guard = state
        .engine
        .admission()
        .acquire(&caller.name)
        .map_err(|holder| Error::Conflict { holder })?;

    let storage = state.engine.storage();
    let tree = apply_patch(&load(storage)?, patch)?;
    let errors = tree.verify();
    if !errors.is_empty() {
        return Err(errors.into());
    }
    store(storage, &tree)?;
    Ok(tree)
}

pub async fn patch_startup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApplianceConfig>, ApiError> {
    let Json(patch) = payload?;
    let tree = patch_stored(
        &state,
        &caller,
        &patch,
        |storage| Ok(storage.load_startup()?.unwrap_or_else(ApplianceConfig::factory_default)),
        ConfigStorage::save_startup,
    )?;
    tracing::info!(client = %caller.name, "Startup configuration patched");
    Ok(Json(tree))
}

pub async fn patch_default(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApplianceConfig>, ApiError> {
    let Json(patch) = payload?;
    let tree = patch_stored(
        &state,
        &caller,
        &patch,
        ConfigStorage::load_default,
        ConfigStorage::save_default,
    )?;
    tracing::info!(client = %caller.name, "Default configuration patched");
    Ok(Json(tree))
}

pub async fn save_startup(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.engine.save_startup()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LegacyImport {
    pub root: PathBuf,
}

/// Import a legacy tree into the AAA section as a tracked task.
pub async fn import_legacy(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<LegacyImport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(LegacyImport { root }) = payload?;
    if !root.is_absolute() {
        return Err(Error::validation(format!("legacy root must be absolute: {}", root.display())).into());
    }

    let engine = state.engine.clone();
    let client = caller.name.clone();
    let task = state.tasks.spawn(
        format!("import legacy configuration from {}", root.display()),
        move |progress, stop| async move {
            if stop.is_stopped() {
                return Err("stopped before commit".to_string());
            }
            progress.report(0.1, None).await;

            // The legacy tree is read into the clone taken under the lock.
            let committed = engine
                .commit::<AaaConfig, _>(&client, move |aaa: &mut AaaConfig| {
                    aaa.legacy(&root);
                    Ok(())
                })
                .await
                .map_err(|e| e.to_string())?;

            progress
                .report(1.0, Some(json!({ "changes": committed.diff.changes() })))
                .await;
            Ok(())
        },
    );

    let status: TaskStatus = task.status();
    Ok((StatusCode::ACCEPTED, Json(status)))
}
