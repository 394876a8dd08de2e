//! Transactional configuration engine.
//!
//! # Data Flow
//! ```text
//! mutation request
//!     → lock.rs (AdmissionLock::acquire, refuse if held)
//!     → clone the live tree, apply the change to the target section
//!     → Section::verify()            ── errors ──▶ Rejected (nothing saved)
//!     → Section::save(&live)         ── errors ──▶ rollback: live.clone().save(&live) ──▶ Failed
//!     → ArcSwap::store(new tree)     (readers see old or new, never a mix)
//!     → guard dropped, lock released
//!
//! process start
//!     → storage.rs (startup.json) or factory + legacy import
//!     → bootstrap.rs (verify, save against factory, BootContext)
//! ```
//!
//! # Design Decisions
//! - No queuing: a held lock fails the request immediately
//! - Verify is pure; an invalid change never reaches the host
//! - Rollback errors are reported next to the original errors, never swallowed
//! - Reads are lock-free snapshots

pub mod bootstrap;
pub mod commit;
pub mod lock;
pub mod storage;
pub mod tree;

pub use bootstrap::{bootstrap, BootContext, Bootstrapped};
pub use commit::{CommitError, Committed, ConfigEngine};
pub use lock::{AdmissionGuard, AdmissionLock, OwnedAdmissionGuard};
pub use storage::{ConfigStorage, StorageError};
pub use tree::{ApplianceConfig, TreeSection};
