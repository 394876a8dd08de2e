//! RADIUS section: server list and enablement flags.

use std::net::IpAddr;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::section::{ChangeKind, ConfigDiff, Section, SectionKind};
use crate::system::{SystemContext, SystemPaths};

use super::files;

/// Port used when a server is configured without one.
pub const DEFAULT_AUTH_PORT: u16 = 1812;

/// One RADIUS authentication server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusServer {
    /// Server IP address (v4 or v6).
    pub ip: String,

    /// Shared secret.
    pub secret: String,

    /// Authentication port; 0 means the default.
    #[serde(default)]
    pub port: u16,
}

impl RadiusServer {
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_AUTH_PORT
        } else {
            self.port
        }
    }

    /// `host:port` with IPv6 hosts bracketed.
    pub fn address(&self) -> String {
        files::server_key(&self.ip, self.effective_port())
    }
}

/// RADIUS authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusConfig {
    /// Use RADIUS for logins.
    #[serde(rename = "enable")]
    pub enabled: bool,

    /// Fall back to local accounts when RADIUS rejects or is unreachable.
    pub fallback: bool,

    /// Servers, tried in order.
    pub servers: Vec<RadiusServer>,
}

impl RadiusConfig {
    /// Remove servers named by `host` or `host:port`.
    ///
    /// Returns the names that matched nothing. Nothing is removed unless
    /// every name matches.
    pub fn remove_servers(&mut self, names: &[String]) -> Result<(), Vec<Error>> {
        let targets: Vec<(&String, Option<(String, Option<u16>)>)> = names
            .iter()
            .map(|n| (n, files::split_host_port(n.trim())))
            .collect();

        let mut matched = vec![false; targets.len()];
        let mut kept = Vec::with_capacity(self.servers.len());

        'servers: for server in &self.servers {
            for (idx, (_, target)) in targets.iter().enumerate() {
                let Some((host, port)) = target else { continue };
                let port_ok = port.map_or(true, |p| p == server.effective_port());
                if *host == server.ip && port_ok {
                    matched[idx] = true;
                    continue 'servers;
                }
            }
            kept.push(server.clone());
        }

        let missing: Vec<Error> = targets
            .iter()
            .zip(&matched)
            .filter(|(_, m)| !**m)
            .map(|((name, _), _)| Error::NotFound(name.to_string()))
            .collect();

        if missing.is_empty() {
            self.servers = kept;
            Ok(())
        } else {
            Err(missing)
        }
    }
}

#[async_trait]
impl Section for RadiusConfig {
    const KIND: SectionKind = SectionKind::Radius;

    fn verify(&self) -> Vec<Error> {
        if self.enabled && self.servers.is_empty() {
            return vec![Error::validation(
                "enabling RADIUS requires at least one server",
            )];
        }

        let mut errors = Vec::new();
        for (idx, server) in self.servers.iter().enumerate() {
            if server.ip.parse::<IpAddr>().is_err() {
                errors.push(Error::validation(format!("bad RADIUS server IP: {}", server.ip)));
            }
            if self.servers[idx + 1..].iter().any(|s| s.ip == server.ip) {
                errors.push(Error::validation(format!("duplicate RADIUS server: {}", server.ip)));
            }
            if server.secret.is_empty() {
                errors.push(Error::validation(format!(
                    "empty secret for RADIUS server {}",
                    server.ip
                )));
            } else if server.secret.chars().any(char::is_whitespace) {
                errors.push(Error::validation(format!(
                    "secret for RADIUS server {} must not contain whitespace",
                    server.ip
                )));
            }
        }
        errors
    }

    async fn save(&mut self, old: &Self, ctx: &SystemContext) -> Vec<Error> {
        let mut errors = Vec::new();

        let toggled = if self.enabled {
            files::enable(&ctx.paths, self.fallback, &ctx.nss_module)
        } else {
            files::disable(&ctx.paths)
        };
        if let Err(e) = toggled {
            errors.push(Error::persistence(format!(
                "failed to {} RADIUS: {}",
                if self.enabled { "enable" } else { "disable" },
                e
            )));
        }

        for server in &mut self.servers {
            server.port = server.effective_port();
        }

        let diff = old.diff(self);
        for removed in diff.entries("servers", ChangeKind::Deleted) {
            tracing::info!(server = %removed, "Removing RADIUS server");
        }

        if let Err(e) = files::write_server_list(&ctx.paths.radius_servers(), &self.servers) {
            errors.push(Error::persistence(format!("failed to write RADIUS servers: {}", e)));
        }

        errors
    }

    fn factory(&mut self) {
        self.enabled = false;
        self.fallback = false;
        self.servers = Vec::new();
    }

    fn legacy(&mut self, root: &Path) {
        let paths = SystemPaths::new(root);

        match files::read_server_list(&paths.radius_servers()) {
            Ok(servers) => self.servers = servers,
            Err(e) => {
                tracing::error!(error = %e, "Legacy[aaa/radius]: failed to read server list");
                return;
            }
        }

        if self.servers.is_empty() {
            self.enabled = false;
        } else {
            match files::legacy_pam_status(&paths.pam_radius_legacy()) {
                Ok(enabled) => self.enabled = enabled,
                Err(e) => tracing::error!(error = %e, "Legacy[aaa/radius]: failed to read PAM status"),
            }
        }

        // Legacy firmware always allowed local fallback.
        self.fallback = true;
    }

    fn diff(&self, other: &Self) -> ConfigDiff {
        let mut diff = ConfigDiff::new();
        diff.field("enable", &self.enabled, &other.enabled)
            .field("fallback", &self.fallback, &other.fallback)
            .keyed_list("servers", &self.servers, &other.servers, |s| s.ip.clone());
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::DryRunShell;
    use std::fs;
    use std::sync::Arc;

    fn server(ip: &str) -> RadiusServer {
        RadiusServer {
            ip: ip.to_string(),
            secret: "testing123".to_string(),
            port: 0,
        }
    }

    fn scratch_ctx() -> (tempfile::TempDir, SystemContext) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc/pam.d")).unwrap();
        fs::create_dir_all(dir.path().join("etc/raddb")).unwrap();
        fs::write(dir.path().join("etc/nsswitch.conf"), "passwd: files\n").unwrap();
        let ctx = SystemContext::new(SystemPaths::new(dir.path()), Arc::new(DryRunShell::new()));
        (dir, ctx)
    }

    #[test]
    fn test_enabled_without_servers_is_single_error() {
        let cfg = RadiusConfig {
            enabled: true,
            fallback: false,
            servers: vec![],
        };
        let errors = cfg.verify();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            Error::validation("enabling RADIUS requires at least one server")
        );
    }

    #[test]
    fn test_verify_reports_every_violation() {
        let mut bad_secret = server("10.0.0.2");
        bad_secret.secret.clear();
        let cfg = RadiusConfig {
            enabled: true,
            fallback: true,
            servers: vec![server("10.0.0.1"), server("not-an-ip"), server("10.0.0.1"), bad_secret],
        };

        let errors = cfg.verify();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.kind() == crate::error::ErrorKind::Validation));
        assert_eq!(cfg.verify(), errors);
    }

    #[test]
    fn test_remove_servers_all_or_nothing() {
        let mut cfg = RadiusConfig {
            servers: vec![server("10.0.0.1"), server("10.0.0.2")],
            ..RadiusConfig::default()
        };

        let err = cfg
            .remove_servers(&["10.0.0.1".to_string(), "10.0.0.9".to_string()])
            .unwrap_err();
        assert_eq!(err, vec![Error::NotFound("10.0.0.9".into())]);
        assert_eq!(cfg.servers.len(), 2);

        cfg.remove_servers(&["10.0.0.2:1812".to_string()]).unwrap();
        assert_eq!(cfg.servers, vec![server("10.0.0.1")]);

        let err = cfg.remove_servers(&["10.0.0.1:1645".to_string()]).unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[tokio::test]
    async fn test_save_writes_servers_and_toggles_pam() {
        let (_dir, ctx) = scratch_ctx();
        let old = RadiusConfig::default();
        let mut cfg = RadiusConfig {
            enabled: true,
            fallback: true,
            servers: vec![server("10.0.0.1")],
        };

        let errors = cfg.save(&old, &ctx).await;
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(cfg.servers[0].port, DEFAULT_AUTH_PORT);
        assert_eq!(
            fs::read_to_string(ctx.paths.radius_servers()).unwrap(),
            "10.0.0.1:1812 testing123\n"
        );
        assert!(files::pam_status(&ctx.paths.pam_radius()).unwrap());
    }

    #[tokio::test]
    async fn test_save_accumulates_errors() {
        let (dir, ctx) = scratch_ctx();
        fs::remove_file(dir.path().join("etc/nsswitch.conf")).unwrap();
        fs::remove_dir_all(dir.path().join("etc/raddb")).unwrap();

        let mut cfg = RadiusConfig::default();
        let errors = cfg.save(&RadiusConfig::default(), &ctx).await;
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_legacy_import() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc/pam.d")).unwrap();
        fs::create_dir_all(dir.path().join("etc/raddb")).unwrap();
        fs::write(dir.path().join("etc/raddb/server"), "10.1.1.1:1812 abc\n").unwrap();
        fs::write(
            dir.path().join("etc/pam.d/vbg_radius"),
            "auth sufficient pam_radius_auth.so\n",
        )
        .unwrap();

        let mut cfg = RadiusConfig::default();
        cfg.legacy(dir.path());
        assert!(cfg.enabled);
        assert!(cfg.fallback);
        assert_eq!(cfg.servers[0].secret, "abc");
    }

    #[test]
    fn test_legacy_missing_tree_keeps_servers() {
        let mut cfg = RadiusConfig {
            servers: vec![server("10.0.0.1")],
            ..RadiusConfig::default()
        };
        let before = cfg.clone();
        cfg.legacy(Path::new("/nonexistent/legacy-root"));
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_diff_by_ip() {
        let old = RadiusConfig {
            servers: vec![server("10.0.0.1"), server("10.0.0.2")],
            ..RadiusConfig::default()
        };
        let mut new = old.clone();
        new.enabled = true;
        new.servers.remove(0);

        let diff = old.diff(&new);
        assert_eq!(diff.field_change("enable"), Some(ChangeKind::Updated));
        assert_eq!(diff.entry_change("servers", "10.0.0.1"), Some(ChangeKind::Deleted));
        assert_eq!(diff.entry_change("servers", "10.0.0.2"), Some(ChangeKind::Unchanged));
    }
}
