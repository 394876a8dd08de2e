//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Save / authenticate
//!     → system::Shell (useradd, userdel, radclient, ...)
//!     → timeouts.rs (deadline on every child process)
//!     → Elapsed surfaces as a distinct error kind
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Timed-out children are killed, never left running

pub mod timeouts;
