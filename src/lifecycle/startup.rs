//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: an unreadable state directory is fatal
//! - Subsystems initialize in order: system context, live tree, engine, authenticator
//! - Listeners start last (traffic only when the live tree is published)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::aaa::radius::{RadclientTransport, RadiusClient};
use crate::auth::{Authenticator, CommandLocalAuthenticator};
use crate::engine::{bootstrap, ConfigEngine, ConfigStorage, StorageError};
use crate::http::AppState;
use crate::settings::Settings;
use crate::system::SystemContext;
use crate::tasks::TaskManager;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load configuration state: {0}")]
    Storage(#[from] StorageError),
}

/// Authenticator backed by `radclient` and the local password helper.
pub fn build_authenticator(settings: &Settings, system: &SystemContext) -> Authenticator {
    let transport = RadclientTransport::new(
        settings.radius.client_program.clone(),
        Duration::from_secs(settings.radius.timeout_secs),
        settings.radius.retries,
        Arc::clone(&system.shell),
    );
    let local = CommandLocalAuthenticator::new(
        settings.local_auth.program.clone(),
        settings.accounts.admin_group.clone(),
        Arc::clone(&system.shell),
    );
    Authenticator::new(RadiusClient::new(Arc::new(transport)), Arc::new(local))
}

/// Bootstrap the live tree and assemble the handler state.
pub async fn build_state(settings: Arc<Settings>, system: SystemContext) -> Result<AppState, StartupError> {
    let storage = ConfigStorage::new(&settings.paths.state_dir);
    let legacy_root = Some(settings.paths.legacy_root.as_str())
        .filter(|root| !root.is_empty())
        .map(Path::new);

    let booted = bootstrap(&storage, legacy_root, &system).await?;
    for e in &booted.errors {
        tracing::warn!(error = %e, "Startup configuration applied with errors");
    }
    tracing::info!(
        first_boot = booted.boot.first_boot,
        users = booted.tree.aaa.local_users.users().len(),
        radius = booted.tree.aaa.radius.enabled,
        "Live configuration published"
    );

    let authenticator = build_authenticator(&settings, &system);
    let engine = ConfigEngine::new(booted.tree, system, storage, booted.boot);

    Ok(AppState {
        engine: Arc::new(engine),
        tasks: Arc::new(TaskManager::new()),
        authenticator,
        settings,
    })
}
