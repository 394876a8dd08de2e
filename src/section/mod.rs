//! Configuration section contract.
//!
//! # Data Flow
//! ```text
//! live section ── clone() ──▶ candidate
//!                               │ apply proposed change
//!                               ▼
//!                          verify()          (pure, no I/O)
//!                               │ ok
//!                               ▼
//!                       save(&live, ctx)     (side effects, deltas from `live`)
//!                               │ ok
//!                               ▼
//! live section ◀── copy_from(candidate)
//! ```
//!
//! # Design Decisions
//! - The set of sections is closed: [`SectionKind`] tags every variant
//! - Dispatch is static through the [`Section`] trait, no runtime casts
//! - Parent sections compose their children; errors accumulate, no child is skipped
//! - Cloning is Rust `Clone`: sections own all their state, so copies never alias

pub mod diff;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;
use crate::system::SystemContext;

pub use diff::{ChangeKind, ConfigDiff};

/// Every section type in the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Root,
    Aaa,
    Radius,
    LocalUsers,
}

impl SectionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            SectionKind::Root => "root",
            SectionKind::Aaa => "aaa",
            SectionKind::Radius => "aaa/radius",
            SectionKind::LocalUsers => "aaa/localusers",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Capabilities shared by every configuration section.
#[async_trait]
pub trait Section: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: SectionKind;

    /// Replace every field with an independent copy of `other`'s.
    fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Validate without touching the host. One error per violated invariant.
    fn verify(&self) -> Vec<Error>;

    /// Apply the current values to the host, using `old` to compute deltas.
    ///
    /// May normalise `self` (defaults filled in, protected entries carried over).
    async fn save(&mut self, old: &Self, ctx: &SystemContext) -> Vec<Error>;

    /// Reset to factory values.
    fn factory(&mut self);

    /// Import from a legacy on-disk tree rooted at `root`.
    ///
    /// Failures are logged and leave the section unchanged.
    fn legacy(&mut self, _root: &Path) {}

    /// Classify what changed from `self` to `other`.
    fn diff(&self, other: &Self) -> ConfigDiff;

    /// A section holding factory values.
    fn factory_default() -> Self
    where
        Self: Default,
    {
        let mut section = Self::default();
        section.factory();
        section
    }
}
