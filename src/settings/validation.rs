//! Settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: Settings → Result<(), Vec<ValidationError>>
//! - Runs before the settings are handed to any subsystem

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use super::schema::Settings;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One violated rule, naming the offending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", settings.listener.bind_address),
        ));
    }
    if settings.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be greater than 0"));
    }
    if settings.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }

    for (field, value) in [
        ("paths.root", &settings.paths.root),
        ("paths.state_dir", &settings.paths.state_dir),
        ("accounts.home_dir", &settings.accounts.home_dir),
        ("accounts.login_shell", &settings.accounts.login_shell),
    ] {
        if !Path::new(value).is_absolute() {
            errors.push(ValidationError::new(field, format!("'{}' is not an absolute path", value)));
        }
    }
    if !settings.paths.legacy_root.is_empty() && !Path::new(&settings.paths.legacy_root).is_absolute() {
        errors.push(ValidationError::new(
            "paths.legacy_root",
            format!("'{}' is not an absolute path", settings.paths.legacy_root),
        ));
    }

    if settings.accounts.default_group.is_empty() {
        errors.push(ValidationError::new("accounts.default_group", "must not be empty"));
    }
    if settings.accounts.admin_group.is_empty() {
        errors.push(ValidationError::new("accounts.admin_group", "must not be empty"));
    }
    if !settings.accounts.default_group.is_empty()
        && settings.accounts.default_group == settings.accounts.admin_group
    {
        errors.push(ValidationError::new(
            "accounts.admin_group",
            "must differ from accounts.default_group",
        ));
    }

    if settings.radius.nss_module.is_empty() {
        errors.push(ValidationError::new("radius.nss_module", "must not be empty"));
    }
    if settings.radius.client_program.is_empty() {
        errors.push(ValidationError::new("radius.client_program", "must not be empty"));
    }
    if settings.radius.timeout_secs == 0 {
        errors.push(ValidationError::new("radius.timeout_secs", "must be greater than 0"));
    }
    if settings.local_auth.program.is_empty() {
        errors.push(ValidationError::new("local_auth.program", "must not be empty"));
    }
    if settings.commands.timeout_secs == 0 {
        errors.push(ValidationError::new("commands.timeout_secs", "must be greater than 0"));
    }

    if !LOG_LEVELS.contains(&settings.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", settings.observability.log_level),
        ));
    }
    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", settings.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
