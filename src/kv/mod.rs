//! Line-oriented `key value...` system configuration files.
//!
//! # Data Flow
//! ```text
//! /etc/raddb/server, /etc/pam.d/*, /etc/nsswitch.conf
//!     → KvStore::open (parse non-empty, non-comment lines)
//!     → ordered Vec<KvPair> (sole source of truth while open)
//!     → add / delete / query in memory
//!     → sync() or close() (truncate + rewrite the whole file)
//! ```
//!
//! # Design Decisions
//! - Keys are not unique; queries return every match in file order
//! - Existing records are never reordered: new records append, removals are in place
//! - Comments and blank lines are dropped on read and not written back

pub mod store;

pub use store::{KvError, KvPair, KvStore};
