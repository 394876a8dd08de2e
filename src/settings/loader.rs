//! Settings loading from disk.

use std::fs;
use std::io;
use std::path::Path;

use super::schema::Settings;
use super::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
            SettingsError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(SettingsError::Io)?;
    parse_settings(&content)
}

pub fn parse_settings(content: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = toml::from_str(content).map_err(SettingsError::Parse)?;
    validate_settings(&settings).map_err(SettingsError::Validation)?;
    Ok(settings)
}

/// Like [`load_settings`], but a missing file yields the defaults.
///
/// Runs before logging is set up, so the caller reports the fallback.
pub fn load_settings_or_default(path: &Path) -> Result<Settings, SettingsError> {
    match load_settings(path) {
        Err(SettingsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
        other => other,
    }
}
