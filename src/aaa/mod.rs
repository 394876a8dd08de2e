//! Authentication, authorization and accounting configuration.
//!
//! # Data Flow
//! ```text
//! AaaConfig
//!     ├── radius       (RadiusConfig: PAM/NSS + server list)
//!     └── localusers   (LocalUsers: passwd/shadow/group)
//! ```
//!
//! # Design Decisions
//! - Children are always visited in the same order: RADIUS, then local users
//! - A failing child never stops its sibling; errors are concatenated

pub mod local_users;
pub mod radius;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::section::{ConfigDiff, Section, SectionKind};
use crate::system::SystemContext;

use local_users::LocalUsers;
use radius::RadiusConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AaaConfig {
    pub radius: RadiusConfig,

    #[serde(rename = "localusers")]
    pub local_users: LocalUsers,
}

#[async_trait]
impl Section for AaaConfig {
    const KIND: SectionKind = SectionKind::Aaa;

    fn verify(&self) -> Vec<Error> {
        let mut errors = self.radius.verify();
        errors.extend(self.local_users.verify());
        errors
    }

    async fn save(&mut self, old: &Self, ctx: &SystemContext) -> Vec<Error> {
        let mut errors = self.radius.save(&old.radius, ctx).await;
        errors.extend(self.local_users.save(&old.local_users, ctx).await);
        errors
    }

    fn factory(&mut self) {
        self.radius.factory();
        self.local_users.factory();
    }

    fn legacy(&mut self, root: &Path) {
        self.radius.legacy(root);
        self.local_users.legacy(root);
    }

    fn diff(&self, other: &Self) -> ConfigDiff {
        let mut diff = ConfigDiff::new();
        diff.nest("radius", self.radius.diff(&other.radius))
            .nest("localusers", self.local_users.diff(&other.local_users));
        diff
    }
}
