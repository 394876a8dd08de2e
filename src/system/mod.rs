//! Host system access.
//!
//! # Data Flow
//! ```text
//! Section::save(old, &SystemContext)
//!     → paths.rs (every system file resolved under one root)
//!     → shell.rs (external commands with deadlines)
//!     → AccountSettings (group names, home, login shell)
//! ```
//!
//! # Design Decisions
//! - One context value is built at startup and passed explicitly; nothing global
//! - The root prefix lets tests and legacy imports reuse the same code paths
//! - `DryRunShell` records commands instead of running them

pub mod paths;
pub mod shell;

use std::sync::Arc;
use std::time::Duration;

use crate::settings::Settings;

pub use paths::SystemPaths;
pub use shell::{CommandOutput, DryRunShell, Shell, ShellError, SystemShell};

/// Group and login defaults applied to locally managed accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSettings {
    pub home_dir: String,
    pub login_shell: String,
    pub default_group: String,
    pub admin_group: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            home_dir: "/tmp".to_string(),
            login_shell: "/usr/bin/appliance-shell".to_string(),
            default_group: "users".to_string(),
            admin_group: "wheel".to_string(),
        }
    }
}

/// Everything a section needs to touch the host.
#[derive(Clone)]
pub struct SystemContext {
    pub paths: SystemPaths,
    pub accounts: AccountSettings,
    /// NSS module consulted when RADIUS is enabled.
    pub nss_module: String,
    pub shell: Arc<dyn Shell>,
}

impl SystemContext {
    pub fn new(paths: SystemPaths, shell: Arc<dyn Shell>) -> Self {
        Self {
            paths,
            accounts: AccountSettings::default(),
            nss_module: "radius".to_string(),
            shell,
        }
    }

    /// Build the context described by the daemon settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let timeout = Duration::from_secs(settings.commands.timeout_secs);
        let shell: Arc<dyn Shell> = if settings.commands.dry_run {
            Arc::new(DryRunShell::new())
        } else {
            Arc::new(SystemShell::new(timeout))
        };

        Self {
            paths: SystemPaths::new(&settings.paths.root),
            accounts: AccountSettings {
                home_dir: settings.accounts.home_dir.clone(),
                login_shell: settings.accounts.login_shell.clone(),
                default_group: settings.accounts.default_group.clone(),
                admin_group: settings.accounts.admin_group.clone(),
            },
            nss_module: settings.radius.nss_module.clone(),
            shell,
        }
    }
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("paths", &self.paths)
            .field("accounts", &self.accounts)
            .field("nss_module", &self.nss_module)
            .finish_non_exhaustive()
    }
}
