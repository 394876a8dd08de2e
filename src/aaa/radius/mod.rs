//! RADIUS authentication section.
//!
//! # Data Flow
//! ```text
//! RadiusConfig (enable, fallback, servers)
//!     → save(): files::enable/disable   (PAM stack entry + NSS passwd order)
//!     → save(): files::write_server_list (one `host:port secret` per line)
//!
//! login attempt
//!     → RadiusClient::authenticate(servers)
//!     → RadiusTransport per server, in list order, until one answers
//! ```
//!
//! # Design Decisions
//! - A reject ends failover; only transport failures move on to the next server
//! - The wire protocol lives behind [`RadiusTransport`]; the shipped transport drives `radclient`
//! - PAM and NSS are rewritten together so they never disagree

pub mod client;
pub mod config;
pub mod files;

pub use client::{
    RadclientTransport, RadiusAnswer, RadiusClient, RadiusTransport, RadiusVerdict, TransportError,
    ADMIN_PRIVILEGE_LEVEL,
};
pub use config::{RadiusConfig, RadiusServer, DEFAULT_AUTH_PORT};
