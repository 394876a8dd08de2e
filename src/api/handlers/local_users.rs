use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::aaa::local_users::{LocalUsers, Privilege, User};
use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::error::Error;
use crate::http::server::AppState;

use super::{commit, read, split_names, NameList};

/// Body of `PUT /aaa/localusers/{username}`. The password is required.
#[derive(Debug, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub password: String,
    pub privilege: Option<Privilege>,
}

pub async fn get_users(State(state): State<AppState>) -> Json<LocalUsers> {
    Json(read(&state))
}

pub async fn put_users(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Vec<User>>, JsonRejection>,
) -> Result<Json<LocalUsers>, ApiError> {
    let Json(users) = payload?;
    commit(&state, &caller, move |current: &mut LocalUsers| {
        current.0 = users;
        Ok(())
    })
    .await
}

pub async fn post_users(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Vec<User>>, JsonRejection>,
) -> Result<Json<LocalUsers>, ApiError> {
    let Json(users) = payload?;
    commit(&state, &caller, move |current: &mut LocalUsers| current.add_users(users)).await
}

/// Best-effort delete: known names are removed and committed, unknown names
/// are reported with 404. Without `?users=` every user except the default
/// administrator is removed.
pub async fn delete_users(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<NameList>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let names = split_names(query.users.as_deref());
    let mut missing = Vec::new();

    let committed = commit(&state, &caller, |current: &mut LocalUsers| {
        if names.is_empty() {
            current.0.clear();
        } else {
            missing = current.remove_users(&names);
        }
        Ok(())
    })
    .await?;

    if missing.is_empty() {
        Ok(committed.into_response())
    } else {
        Ok(ApiError::from_errors(&missing).into_response())
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, ApiError> {
    read::<LocalUsers>(&state)
        .find(&username)
        .cloned()
        .map(Json)
        .ok_or_else(|| Error::NotFound(username).into())
}

fn with_user<F>(username: String, update: F) -> impl FnOnce(&mut LocalUsers) -> Result<(), Vec<Error>> + Send
where
    F: FnOnce(&mut User) + Send,
{
    move |users: &mut LocalUsers| match users.find_mut(&username) {
        Some(user) => {
            update(user);
            Ok(())
        }
        None => Err(vec![Error::NotFound(username)]),
    }
}

pub async fn put_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<LocalUsers>, ApiError> {
    let Json(update) = payload?;
    commit(
        &state,
        &caller,
        with_user(username, move |user| {
            user.password = update.password;
            if let Some(privilege) = update.privilege {
                user.privilege = privilege;
            }
        }),
    )
    .await
}

pub async fn put_password(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
    payload: Result<Json<String>, JsonRejection>,
) -> Result<Json<LocalUsers>, ApiError> {
    let Json(password) = payload?;
    commit(&state, &caller, with_user(username, move |user| user.password = password)).await
}

pub async fn put_privilege(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
    payload: Result<Json<Privilege>, JsonRejection>,
) -> Result<Json<LocalUsers>, ApiError> {
    let Json(privilege) = payload?;
    commit(&state, &caller, with_user(username, move |user| user.privilege = privilege)).await
}
