//! Shared fixtures for integration tests: a scratch system root and an
//! engine or API bootstrapped on top of it.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use appliance_configd::engine::{bootstrap, ConfigEngine, ConfigStorage};
use appliance_configd::http::AppState;
use appliance_configd::lifecycle;
use appliance_configd::settings::Settings;
use appliance_configd::system::{DryRunShell, SystemContext, SystemPaths};
use tempfile::TempDir;

pub const PASSWD: &str = "root:x:0:0::/root:/bin/sh\n\
                          admin:x:1000:100::/tmp:/usr/bin/appliance-shell\n\
                          radius:x:1001:100::/tmp:/bin/false\n";
pub const SHADOW: &str = "root:*:1:0:99999:7:::\nadmin:$6$a:1:0:99999:7:::\n";
pub const GROUP: &str = "root:x:0:\nwheel:x:10:root,admin\nusers:x:100:radius,admin\n";
pub const NSSWITCH: &str = "passwd: files\ngroup: files\n";

/// Files a commit may touch, relative to the root.
pub const SYSTEM_FILES: [&str; 6] = [
    "etc/passwd",
    "etc/shadow",
    "etc/group",
    "etc/nsswitch.conf",
    "etc/pam.d/pam_radius",
    "etc/raddb/server",
];

/// A fresh system root with an account database and RADIUS directories.
pub fn scratch_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let etc = dir.path().join("etc");
    fs::create_dir_all(etc.join("pam.d")).unwrap();
    fs::create_dir_all(etc.join("raddb")).unwrap();
    fs::write(etc.join("passwd"), PASSWD).unwrap();
    fs::write(etc.join("shadow"), SHADOW).unwrap();
    fs::write(etc.join("group"), GROUP).unwrap();
    fs::write(etc.join("nsswitch.conf"), NSSWITCH).unwrap();
    dir
}

pub fn read(root: &Path, file: &str) -> String {
    fs::read_to_string(root.join(file)).unwrap_or_default()
}

/// Contents of every system file, for byte-for-byte comparisons.
pub fn snapshot(root: &Path) -> Vec<String> {
    SYSTEM_FILES.iter().map(|f| read(root, f)).collect()
}

pub struct EngineHarness {
    pub dir: TempDir,
    pub shell: Arc<DryRunShell>,
    pub engine: ConfigEngine,
}

/// An engine bootstrapped from factory values on a scratch root.
pub async fn engine() -> EngineHarness {
    let dir = scratch_root();
    let shell = Arc::new(DryRunShell::new());
    let system = SystemContext::new(SystemPaths::new(dir.path()), shell.clone());
    let storage = ConfigStorage::new(dir.path().join("state"));

    let booted = bootstrap(&storage, None, &system).await.unwrap();
    assert!(booted.errors.is_empty(), "{:?}", booted.errors);

    let engine = ConfigEngine::new(booted.tree, system, storage, booted.boot);
    EngineHarness { dir, shell, engine }
}

pub struct ApiHarness {
    pub dir: TempDir,
    pub shell: Arc<DryRunShell>,
    pub state: AppState,
}

/// Handler state built the way the daemon builds it, on a scratch root.
pub async fn api() -> ApiHarness {
    let dir = scratch_root();
    let shell = Arc::new(DryRunShell::new());

    let mut settings = Settings::default();
    settings.paths.root = dir.path().display().to_string();
    settings.paths.state_dir = dir.path().join("state").display().to_string();
    settings.commands.dry_run = true;

    let system = SystemContext::new(SystemPaths::new(dir.path()), shell.clone());
    let state = lifecycle::build_state(Arc::new(settings), system).await.unwrap();
    ApiHarness { dir, shell, state }
}
