//! Daemon settings.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (read & deserialize, defaults for missing tables)
//!     → validation.rs (semantic checks, every violation reported)
//!     → Settings (validated, immutable)
//!     → passed by reference to main, SystemContext, HttpServer
//! ```
//!
//! # Design Decisions
//! - Settings describe the daemon, not the appliance; appliance state lives in the engine
//! - All fields have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, load_settings_or_default, parse_settings, SettingsError};
pub use schema::{
    AccountsSettings, CommandSettings, ListenerSettings, LocalAuthSettings, ObservabilitySettings,
    PathSettings, RadiusSettings, Settings,
};
pub use validation::{validate_settings, ValidationError};
