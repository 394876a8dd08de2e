//! The root of the configuration tree.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aaa::local_users::LocalUsers;
use crate::aaa::radius::RadiusConfig;
use crate::aaa::AaaConfig;
use crate::error::Error;
use crate::section::{ConfigDiff, Section, SectionKind};
use crate::system::SystemContext;

/// Everything the engine manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplianceConfig {
    pub aaa: AaaConfig,
}

#[async_trait]
impl Section for ApplianceConfig {
    const KIND: SectionKind = SectionKind::Root;

    fn verify(&self) -> Vec<Error> {
        self.aaa.verify()
    }

    async fn save(&mut self, old: &Self, ctx: &SystemContext) -> Vec<Error> {
        self.aaa.save(&old.aaa, ctx).await
    }

    fn factory(&mut self) {
        self.aaa.factory();
    }

    fn legacy(&mut self, root: &Path) {
        self.aaa.legacy(root);
    }

    fn diff(&self, other: &Self) -> ConfigDiff {
        let mut diff = ConfigDiff::new();
        diff.nest("aaa", self.aaa.diff(&other.aaa));
        diff
    }
}

/// A section reachable from the root at a fixed position.
pub trait TreeSection: Section {
    fn locate(tree: &ApplianceConfig) -> &Self;
    fn locate_mut(tree: &mut ApplianceConfig) -> &mut Self;
}

impl TreeSection for ApplianceConfig {
    fn locate(tree: &ApplianceConfig) -> &Self {
        tree
    }
    fn locate_mut(tree: &mut ApplianceConfig) -> &mut Self {
        tree
    }
}

impl TreeSection for AaaConfig {
    fn locate(tree: &ApplianceConfig) -> &Self {
        &tree.aaa
    }
    fn locate_mut(tree: &mut ApplianceConfig) -> &mut Self {
        &mut tree.aaa
    }
}

impl TreeSection for RadiusConfig {
    fn locate(tree: &ApplianceConfig) -> &Self {
        &tree.aaa.radius
    }
    fn locate_mut(tree: &mut ApplianceConfig) -> &mut Self {
        &mut tree.aaa.radius
    }
}

impl TreeSection for LocalUsers {
    fn locate(tree: &ApplianceConfig) -> &Self {
        &tree.aaa.local_users
    }
    fn locate_mut(tree: &mut ApplianceConfig) -> &mut Self {
        &mut tree.aaa.local_users
    }
}
