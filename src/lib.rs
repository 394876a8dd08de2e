//! Appliance configuration daemon.
//!
//! Holds the appliance's AAA configuration (RADIUS servers, local accounts)
//! as a tree of sections, applies changes to the host transactionally and
//! serves it over a management API.
//!
//! # Architecture Overview
//!
//! ```text
//!     HTTP request
//!     ──────────────▶ http ──▶ api (auth, handlers) ──▶ engine (lock, commit, rollback)
//!                                                          │
//!                                   ┌──────────────────────┼──────────────────────┐
//!                                   ▼                      ▼                      ▼
//!                              aaa::radius          aaa::local_users           storage
//!                            (kv files, PAM/NSS)   (passwd/shadow/group)   (startup/default)
//!                                   │                      │
//!                                   └──────── system (paths, shell) ──────────────┘
//!
//!     Cross-cutting: settings, observability, lifecycle, resilience, tasks, auth
//! ```

// Configuration model
pub mod aaa;
pub mod engine;
pub mod error;
pub mod section;

// Host access
pub mod kv;
pub mod system;

// Serving
pub mod api;
pub mod auth;
pub mod http;
pub mod tasks;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod settings;

pub use error::{Error, ErrorKind};
