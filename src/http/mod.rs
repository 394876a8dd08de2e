//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, connect info, graceful shutdown)
//!     → request.rs (request ID set and propagated)
//!     → tower-http layers (trace, timeout, body limit, panic capture)
//!     → api router
//! ```

pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
