//! Persisted copies of the configuration tree.
//!
//! `startup.json` is what the daemon boots from; `default.json` is the
//! operator's "reset" target. Both hold the whole tree as pretty JSON.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::section::Section;

use super::tree::ApplianceConfig;

const STARTUP_FILE: &str = "startup.json";
const DEFAULT_FILE: &str = "default.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{path}: malformed configuration: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads and writes stored trees under one state directory.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    dir: PathBuf,
}

impl ConfigStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn startup_path(&self) -> PathBuf {
        self.dir.join(STARTUP_FILE)
    }

    pub fn default_path(&self) -> PathBuf {
        self.dir.join(DEFAULT_FILE)
    }

    /// `None` when no startup configuration has ever been saved.
    pub fn load_startup(&self) -> Result<Option<ApplianceConfig>, StorageError> {
        read_tree(&self.startup_path())
    }

    pub fn save_startup(&self, tree: &ApplianceConfig) -> Result<(), StorageError> {
        write_tree(&self.startup_path(), tree)
    }

    /// Factory values when no default has been saved.
    pub fn load_default(&self) -> Result<ApplianceConfig, StorageError> {
        Ok(read_tree(&self.default_path())?.unwrap_or_else(ApplianceConfig::factory_default))
    }

    pub fn save_default(&self, tree: &ApplianceConfig) -> Result<(), StorageError> {
        write_tree(&self.default_path(), tree)
    }
}

fn read_tree(path: &Path) -> Result<Option<ApplianceConfig>, StorageError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_tree(path: &Path, tree: &ApplianceConfig) -> Result<(), StorageError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| StorageError::Io { path, source }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let payload = serde_json::to_vec_pretty(tree).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = path.with_extension("partial");
    fs::write(&tmp_path, payload).map_err(io_err(&tmp_path))?;
    fs::rename(&tmp_path, path).map_err(io_err(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aaa::radius::RadiusServer;

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::new(dir.path().join("state"));
        assert!(storage.load_startup().unwrap().is_none());
        assert_eq!(storage.load_default().unwrap(), ApplianceConfig::factory_default());
    }

    #[test]
    fn test_startup_roundtrip_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::new(dir.path().join("state"));

        let mut tree = ApplianceConfig::factory_default();
        tree.aaa.radius.servers.push(RadiusServer {
            ip: "10.0.0.1".into(),
            secret: "s".into(),
            port: 1812,
        });
        storage.save_startup(&tree).unwrap();

        assert_eq!(storage.load_startup().unwrap(), Some(tree));
        assert!(!storage.startup_path().with_extension("partial").exists());
    }

    #[test]
    fn test_malformed_startup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::new(dir.path());
        fs::write(storage.startup_path(), "{not json").unwrap();
        assert!(matches!(storage.load_startup(), Err(StorageError::Json { .. })));
    }
}
