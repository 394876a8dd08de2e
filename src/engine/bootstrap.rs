//! Building the live tree at process start.

use std::path::Path;

use crate::error::Error;
use crate::section::Section;
use crate::system::SystemContext;

use super::storage::{ConfigStorage, StorageError};
use super::tree::ApplianceConfig;

/// Facts about this process start, fixed once bootstrap has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootContext {
    /// No startup configuration existed; factory (or legacy) values were used.
    pub first_boot: bool,
}

/// Result of [`bootstrap`].
#[derive(Debug)]
pub struct Bootstrapped {
    pub tree: ApplianceConfig,
    pub boot: BootContext,
    /// Verify or Save problems met on the way. The tree is usable regardless.
    pub errors: Vec<Error>,
}

/// Load the startup tree, or build one on first boot, and apply it to the host.
///
/// A stored tree that cannot be parsed or fails verification is replaced by
/// factory values.
pub async fn bootstrap(
    storage: &ConfigStorage,
    legacy_root: Option<&Path>,
    system: &SystemContext,
) -> Result<Bootstrapped, StorageError> {
    let factory = ApplianceConfig::factory_default();
    let mut errors = Vec::new();
    let stored = match storage.load_startup() {
        Ok(stored) => stored,
        Err(e @ StorageError::Json { .. }) => {
            tracing::error!(error = %e, "Startup configuration unreadable, using factory values");
            errors.push(Error::persistence(e.to_string()));
            Some(factory.clone())
        }
        Err(e) => return Err(e),
    };
    let boot = BootContext {
        first_boot: stored.is_none(),
    };

    let mut tree = match stored {
        Some(tree) => tree,
        None => {
            tracing::info!(path = %storage.startup_path().display(), "No startup configuration, first boot");
            let mut tree = factory.clone();
            if let Some(root) = legacy_root {
                tracing::info!(root = %root.display(), "Importing legacy configuration");
                tree.legacy(root);
            }
            tree
        }
    };

    let rejected = tree.verify();
    if !rejected.is_empty() {
        for e in &rejected {
            tracing::error!(error = %e, "Startup configuration rejected");
        }
        tree = factory.clone();
    }
    errors.extend(rejected);

    let saved = tree.save(&factory, system).await;
    for e in &saved {
        tracing::error!(error = %e, "Failed to apply startup configuration");
    }
    errors.extend(saved);

    Ok(Bootstrapped { tree, boot, errors })
}
