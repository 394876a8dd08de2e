//! Settings schema definitions.
//!
//! All types derive Serde traits for deserialization from the settings file.

use serde::{Deserialize, Serialize};

/// Root settings for the daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener.
    pub listener: ListenerSettings,

    /// Where system and state files live.
    pub paths: PathSettings,

    /// Defaults applied to managed accounts.
    pub accounts: AccountsSettings,

    /// RADIUS client and NSS module.
    pub radius: RadiusSettings,

    /// Local password checking.
    pub local_auth: LocalAuthSettings,

    /// External command execution.
    pub commands: CommandSettings,

    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerSettings {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Whole-request deadline.
    pub request_timeout_secs: u64,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
            request_timeout_secs: 60,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PathSettings {
    /// Prefix for every system file (`/etc/passwd` becomes `<root>/etc/passwd`).
    pub root: String,

    /// Directory holding startup.json and default.json.
    pub state_dir: String,

    /// Legacy tree imported on first boot. Empty disables the import.
    pub legacy_root: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            state_dir: "/var/lib/appliance-configd".to_string(),
            legacy_root: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AccountsSettings {
    pub home_dir: String,
    pub login_shell: String,
    pub default_group: String,
    pub admin_group: String,
}

impl Default for AccountsSettings {
    fn default() -> Self {
        Self {
            home_dir: "/tmp".to_string(),
            login_shell: "/usr/bin/appliance-shell".to_string(),
            default_group: "users".to_string(),
            admin_group: "wheel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RadiusSettings {
    /// NSS module named in nsswitch.conf when RADIUS is enabled.
    pub nss_module: String,

    /// The `radclient` binary.
    pub client_program: String,

    /// Per-server answer deadline.
    pub timeout_secs: u64,

    /// Attempts per server.
    pub retries: u32,
}

impl Default for RadiusSettings {
    fn default() -> Self {
        Self {
            nss_module: "radius".to_string(),
            client_program: "radclient".to_string(),
            timeout_secs: 3,
            retries: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LocalAuthSettings {
    /// Helper that checks a password read from stdin; exit 0 means valid.
    pub program: String,
}

impl Default for LocalAuthSettings {
    fn default() -> Self {
        Self {
            program: "/usr/libexec/appliance-configd/pam-auth".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CommandSettings {
    /// Deadline for any external command.
    pub timeout_secs: u64,

    /// Log commands instead of running them.
    pub dry_run: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
