//! Per-section request handlers.
//!
//! Every mutation runs through [`ConfigEngine::commit`](crate::engine::ConfigEngine::commit);
//! handlers only decode input, describe the change and encode the result.

pub mod aaa;
pub mod configs;
pub mod local;
pub mod local_users;
pub mod radius;
pub mod tasks;

use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::TreeSection;
use crate::error::Error;
use crate::http::server::AppState;

use super::auth::Caller;
use super::error::ApiError;
use super::patch::apply_patch;

/// `?servers=a,b` / `?users=a,b`.
#[derive(Debug, Default, Deserialize)]
pub struct NameList {
    pub servers: Option<String>,
    pub users: Option<String>,
}

/// Split a comma-separated query value, dropping empty items.
pub fn split_names(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The live value of section `S`.
pub fn read<S: TreeSection>(state: &AppState) -> S {
    S::locate(&state.engine.snapshot()).clone()
}

/// Commit `mutate` against section `S` on behalf of `caller`.
pub async fn commit<S, F>(state: &AppState, caller: &Caller, mutate: F) -> Result<Json<S>, ApiError>
where
    S: TreeSection,
    F: FnOnce(&mut S) -> Result<(), Vec<Error>> + Send,
{
    let committed = state.engine.commit::<S, F>(&caller.name, mutate).await?;
    Ok(Json(committed.section))
}

/// Merge-patch section `S` and commit the result.
pub async fn patch<S: TreeSection>(
    state: &AppState,
    caller: &Caller,
    patch: Value,
) -> Result<Json<S>, ApiError> {
    commit(state, caller, move |section: &mut S| {
        *section = apply_patch(section, &patch).map_err(|e| vec![e])?;
        Ok(())
    })
    .await
}

pub async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}
