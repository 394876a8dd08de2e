//! System file layout.

use std::path::{Path, PathBuf};

const PASSWD: &str = "etc/passwd";
const SHADOW: &str = "etc/shadow";
const GROUP: &str = "etc/group";
const RADIUS_SERVERS: &str = "etc/raddb/server";
const PAM_RADIUS: &str = "etc/pam.d/pam_radius";
const PAM_RADIUS_LEGACY: &str = "etc/pam.d/vbg_radius";
const NSSWITCH: &str = "etc/nsswitch.conf";

/// Absolute locations of every file the engine reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    root: PathBuf,
}

impl SystemPaths {
    /// Resolve all files below `root` (`/` on a real appliance).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn passwd(&self) -> PathBuf {
        self.root.join(PASSWD)
    }

    pub fn shadow(&self) -> PathBuf {
        self.root.join(SHADOW)
    }

    pub fn group(&self) -> PathBuf {
        self.root.join(GROUP)
    }

    pub fn radius_servers(&self) -> PathBuf {
        self.root.join(RADIUS_SERVERS)
    }

    pub fn pam_radius(&self) -> PathBuf {
        self.root.join(PAM_RADIUS)
    }

    /// PAM file used by the previous firmware generation.
    pub fn pam_radius_legacy(&self) -> PathBuf {
        self.root.join(PAM_RADIUS_LEGACY)
    }

    pub fn nsswitch(&self) -> PathBuf {
        self.root.join(NSSWITCH)
    }
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted() {
        let paths = SystemPaths::new("/mnt/legacy");
        assert_eq!(paths.passwd(), PathBuf::from("/mnt/legacy/etc/passwd"));
        assert_eq!(paths.radius_servers(), PathBuf::from("/mnt/legacy/etc/raddb/server"));
        assert_eq!(SystemPaths::default().nsswitch(), PathBuf::from("/etc/nsswitch.conf"));
    }
}
