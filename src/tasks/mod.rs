//! Async task tracker for long-running operations.
//!
//! # Data Flow
//! ```text
//! TaskManager::spawn(body)
//!     → Task (waiting → running)
//!     → body runs on its own tokio task
//!         → ProgressSender ──mpsc──▶ tracker updates progress/data
//!         ◀── StopSignal (watch) ── Task::stop()
//!     → channel closes when the body returns
//!     → completed | failed | stopped
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative; `stopping` becomes `stopped` only after the body exits
//! - Status reads never wait on the body

pub mod manager;
pub mod task;

pub use manager::TaskManager;
pub use task::{Progress, ProgressSender, StopSignal, Task, TaskBody, TaskState, TaskStatus};
