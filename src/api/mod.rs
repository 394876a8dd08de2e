//! Management API.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → auth.rs (loopback bypass, Basic credentials, admin check for mutations)
//!     → handlers/* (decode input, describe the change)
//!     → ConfigEngine::commit (lock, clone, verify, save, rollback, promote)
//!     → error.rs (Error kinds → status codes, {"errors": [...]} body)
//! ```
//!
//! # Design Decisions
//! - Handlers never touch the host directly; the engine owns every side effect
//! - Reads need any authenticated user, mutations need an administrator
//! - `/local/*` is invisible (404) to anything but loopback callers

pub mod auth;
pub mod error;
pub mod handlers;
pub mod patch;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::http::server::AppState;

use self::handlers::{aaa, configs, local, local_users, radius, tasks};

pub use self::auth::Caller;
pub use self::error::ApiError;

/// Build the API router. Transport layers are added by the server.
pub fn router(state: AppState) -> Router {
    let managed = Router::new()
        .route("/aaa", get(aaa::get_aaa).patch(aaa::patch_aaa))
        .route("/aaa/radius", get(radius::get_radius).patch(radius::patch_radius))
        .route("/aaa/radius/enable", get(radius::get_enable).put(radius::put_enable))
        .route("/aaa/radius/fallback", get(radius::get_fallback).put(radius::put_fallback))
        .route(
            "/aaa/radius/servers",
            get(radius::get_servers)
                .put(radius::put_servers)
                .post(radius::post_servers)
                .delete(radius::delete_servers),
        )
        .route(
            "/aaa/localusers",
            get(local_users::get_users)
                .put(local_users::put_users)
                .post(local_users::post_users)
                .delete(local_users::delete_users),
        )
        .route(
            "/aaa/localusers/{username}",
            get(local_users::get_user).put(local_users::put_user),
        )
        .route("/aaa/localusers/{username}/password", put(local_users::put_password))
        .route("/aaa/localusers/{username}/privilege", put(local_users::put_privilege))
        .route("/configs/running", get(configs::get_running).patch(configs::patch_running))
        .route("/configs/startup", get(configs::get_startup).patch(configs::patch_startup))
        .route("/configs/startup/save", post(configs::save_startup))
        .route("/configs/default", get(configs::get_default).patch(configs::patch_default))
        .route("/configs/legacy", post(configs::import_legacy))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/{id}", get(tasks::get_task).delete(tasks::delete_task))
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate));

    let local_only = Router::new()
        .route("/local/radius/enabled", get(local::radius_enabled))
        .route("/local/radius/authenticate", get(local::radius_authenticate))
        .layer(middleware::from_fn(auth::loopback_only));

    Router::new()
        .route("/", get(handlers::ping))
        .merge(managed)
        .merge(local_only)
        .with_state(state)
}
