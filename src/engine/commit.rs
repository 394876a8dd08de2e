//! The commit algorithm.

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::error::Error;
use crate::observability::metrics;
use crate::section::{ConfigDiff, Section};
use crate::system::SystemContext;

use super::bootstrap::BootContext;
use super::lock::{AdmissionLock, OwnedAdmissionGuard};
use super::storage::{ConfigStorage, StorageError};
use super::tree::{ApplianceConfig, TreeSection};

/// Why a commit did not change the live tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    /// Another mutation is in flight.
    #[error("configuration is locked by {holder}")]
    Locked { holder: String },

    /// The change was refused before anything touched the host.
    #[error("configuration rejected: {}", join(.0))]
    Rejected(Vec<Error>),

    /// Save failed; `rollback` lists what the compensating Save could not undo.
    #[error("failed to apply configuration: {}", join(.errors))]
    Failed {
        errors: Vec<Error>,
        rollback: Vec<Error>,
    },
}

fn join(errors: &[Error]) -> String {
    errors.iter().map(Error::to_string).collect::<Vec<_>>().join("; ")
}

impl CommitError {
    /// Every error carried, rollback failures last.
    pub fn errors(&self) -> Vec<Error> {
        match self {
            CommitError::Locked { holder } => vec![Error::Conflict {
                holder: holder.clone(),
            }],
            CommitError::Rejected(errors) => errors.clone(),
            CommitError::Failed { errors, rollback } => {
                errors.iter().chain(rollback.iter()).cloned().collect()
            }
        }
    }
}

/// A successfully applied change.
#[derive(Debug, Clone)]
pub struct Committed<S> {
    /// The section as it now stands in the live tree.
    pub section: S,
    pub diff: ConfigDiff,
}

/// Owns the live tree and serializes every change to it.
pub struct ConfigEngine {
    live: Arc<ArcSwap<ApplianceConfig>>,
    lock: Arc<AdmissionLock>,
    system: SystemContext,
    storage: ConfigStorage,
    boot: BootContext,
}

impl ConfigEngine {
    pub fn new(
        initial: ApplianceConfig,
        system: SystemContext,
        storage: ConfigStorage,
        boot: BootContext,
    ) -> Self {
        Self {
            live: Arc::new(ArcSwap::from_pointee(initial)),
            lock: Arc::new(AdmissionLock::new()),
            system,
            storage,
            boot,
        }
    }

    /// The current live tree. Never observes a half-applied commit.
    pub fn snapshot(&self) -> Arc<ApplianceConfig> {
        self.live.load_full()
    }

    pub fn system(&self) -> &SystemContext {
        &self.system
    }

    pub fn storage(&self) -> &ConfigStorage {
        &self.storage
    }

    pub fn boot(&self) -> BootContext {
        self.boot
    }

    pub fn admission(&self) -> &AdmissionLock {
        &self.lock
    }

    /// Apply `mutate` to a clone of section `S` and promote it if it verifies
    /// and saves.
    ///
    /// `mutate` runs under the admission lock and may refuse the change by
    /// returning errors; nothing is saved in that case. Save, rollback and
    /// promotion run on their own task, so dropping the returned future
    /// never stops a commit halfway through.
    pub async fn commit<S, F>(&self, client: &str, mutate: F) -> Result<Committed<S>, CommitError>
    where
        S: TreeSection,
        F: FnOnce(&mut S) -> Result<(), Vec<Error>> + Send,
    {
        let section = S::KIND.tag();
        let guard = self.lock.acquire_owned(client).map_err(|holder| {
            tracing::warn!(client, holder = %holder, section, "Configuration locked");
            metrics::record_admission_conflict();
            metrics::record_commit(section, "conflict");
            CommitError::Locked { holder }
        })?;

        let live = self.live.load_full();
        let mut tree = (*live).clone();

        if let Err(errors) = mutate(S::locate_mut(&mut tree)) {
            metrics::record_commit(section, "rejected");
            return Err(CommitError::Rejected(errors));
        }

        let errors = S::locate(&tree).verify();
        if !errors.is_empty() {
            tracing::info!(section, errors = errors.len(), "Configuration rejected by verification");
            metrics::record_commit(section, "rejected");
            return Err(CommitError::Rejected(errors));
        }

        let apply = Apply {
            guard,
            target: Arc::clone(&self.live),
            live,
            tree,
            system: self.system.clone(),
            client: client.to_string(),
        };
        match tokio::spawn(apply.run::<S>()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(section, error = %e, "Commit task did not finish");
                Err(CommitError::Failed {
                    errors: vec![Error::Internal(format!("commit task aborted: {}", e))],
                    rollback: Vec::new(),
                })
            }
        }
    }

    /// Persist the live tree as the startup configuration.
    pub fn save_startup(&self) -> Result<(), StorageError> {
        let tree = self.snapshot();
        self.storage.save_startup(&tree)?;
        tracing::info!(path = %self.storage.startup_path().display(), "Startup configuration saved");
        Ok(())
    }
}

/// The Save half of a commit. Owns the admission lock until it is done.
struct Apply {
    guard: OwnedAdmissionGuard,
    target: Arc<ArcSwap<ApplianceConfig>>,
    live: Arc<ApplianceConfig>,
    tree: ApplianceConfig,
    system: SystemContext,
    client: String,
}

impl Apply {
    async fn run<S: TreeSection>(self) -> Result<Committed<S>, CommitError> {
        let Apply {
            guard,
            target,
            live,
            mut tree,
            system,
            client,
        } = self;
        let section = S::KIND.tag();
        let old = S::locate(&live);
        let candidate = S::locate_mut(&mut tree);

        let errors = candidate.save(old, &system).await;
        if !errors.is_empty() {
            for e in &errors {
                tracing::error!(section, error = %e, "Save failed, rolling back");
            }
            let rollback = rollback(old, &system).await;
            metrics::record_commit(
                section,
                if rollback.is_empty() { "failed" } else { "rolled_back_failed" },
            );
            return Err(CommitError::Failed { errors, rollback });
        }

        let diff = old.diff(candidate);
        for change in diff.changes() {
            tracing::info!(section, client = %client, change = %change, "Configuration changed");
        }
        let mut promoted = old.clone();
        promoted.copy_from(candidate);

        target.store(Arc::new(tree));
        metrics::record_commit(section, "applied");
        drop(guard);

        Ok(Committed {
            section: promoted,
            diff,
        })
    }
}

/// Push the host back to `old`. Returns what could not be restored.
async fn rollback<S: Section>(old: &S, system: &SystemContext) -> Vec<Error> {
    let mut restore = old.clone();
    let errors: Vec<Error> = restore
        .save(old, system)
        .await
        .into_iter()
        .map(Error::into_rollback)
        .collect();
    for e in &errors {
        tracing::error!(section = S::KIND.tag(), error = %e, "Rollback failed, host state needs attention");
    }
    errors
}
