//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine, aaa::radius, tasks, api
//!     → logging.rs (structured tracing events, one subscriber built in main)
//!     → metrics.rs (counters behind the `metrics` facade)
//!
//! Consumers:
//!     → stdout / journald
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - No per-severity global loggers; components use the `tracing` macros
//! - `RUST_LOG` overrides the configured level
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
