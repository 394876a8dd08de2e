//! RADIUS artifacts on disk: server list, PAM stack entry, NSS lookup order.

use std::fs::OpenOptions;
use std::net::IpAddr;
use std::path::Path;

use crate::kv::{KvError, KvPair, KvStore};
use crate::system::SystemPaths;

use super::config::{RadiusServer, DEFAULT_AUTH_PORT};

const PAM_KEY: &str = "auth";
const PAM_MODULE: &str = "pam_radius_auth.so";
const PAM_REQUIRED: &str = "required";
const PAM_SUFFICIENT: &str = "sufficient";
const NSS_KEY: &str = "passwd:";
const NSS_FILES: &str = "files";

/// Open a KV file, creating it empty when absent.
fn open_or_create(path: &Path) -> Result<KvStore, KvError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| KvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    KvStore::open(path)
}

/// `host:port` as written to the server file; IPv6 hosts are bracketed.
pub fn server_key(ip: &str, port: u16) -> String {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("[{}]:{}", ip, port),
        _ => format!("{}:{}", ip, port),
    }
}

/// Split a server-file key into host and optional port.
///
/// Accepts `1.2.3.4`, `1.2.3.4:1812`, `::1`, `[::1]` and `[::1]:1812`.
pub fn split_host_port(key: &str) -> Option<(String, Option<u16>)> {
    if key.parse::<IpAddr>().is_ok() {
        return Some((key.to_string(), None));
    }
    if let Some(rest) = key.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(p.parse().ok()?),
            None if tail.is_empty() => None,
            None => return None,
        };
        return Some((host.to_string(), port));
    }
    let (host, port) = key.rsplit_once(':')?;
    Some((host.to_string(), Some(port.parse().ok()?)))
}

/// Parse the server list file. Malformed lines are logged and skipped.
pub fn read_server_list(path: &Path) -> Result<Vec<RadiusServer>, KvError> {
    let store = KvStore::open(path)?;
    let mut servers = Vec::new();

    for pair in store.all() {
        let Some((host, port)) = split_host_port(&pair.key) else {
            tracing::warn!(path = %path.display(), entry = %pair.key, "Bad RADIUS server address in config file");
            continue;
        };
        if host.parse::<IpAddr>().is_err() {
            tracing::warn!(path = %path.display(), entry = %pair.key, "Bad RADIUS server address in config file");
            continue;
        }
        let Some(secret) = pair.values.first() else {
            tracing::warn!(path = %path.display(), entry = %pair.key, "Empty RADIUS secret in config file");
            continue;
        };
        servers.push(RadiusServer {
            ip: host,
            secret: secret.clone(),
            port: port.unwrap_or(DEFAULT_AUTH_PORT),
        });
    }

    Ok(servers)
}

/// Replace the server list file with `servers`.
pub fn write_server_list(path: &Path, servers: &[RadiusServer]) -> Result<(), KvError> {
    let mut store = open_or_create(path)?;
    store.delete_all();
    for server in servers {
        let port = if server.port == 0 { DEFAULT_AUTH_PORT } else { server.port };
        store.add_strings(&server_key(&server.ip, port), [server.secret.as_str()])?;
    }
    store.close()
}

/// Point PAM and NSS at RADIUS. `fallback` permits local authentication
/// when RADIUS rejects.
pub fn enable(paths: &SystemPaths, fallback: bool, nss_module: &str) -> Result<(), KvError> {
    let control = if fallback { PAM_SUFFICIENT } else { PAM_REQUIRED };
    let pam_line = KvPair::new(PAM_KEY, [control, PAM_MODULE, "debug"]);
    let nss_line = KvPair::new(NSS_KEY, [NSS_FILES, nss_module]);
    apply_pair(paths, Some(pam_line), nss_line)
}

/// Remove RADIUS from both PAM and NSS.
pub fn disable(paths: &SystemPaths) -> Result<(), KvError> {
    apply_pair(paths, None, KvPair::new(NSS_KEY, [NSS_FILES]))
}

/// Rewrite the PAM entry and NSS order together.
///
/// Both files are loaded before anything is written; if the NSS write fails
/// the PAM file is restored so the two never disagree.
fn apply_pair(paths: &SystemPaths, pam_line: Option<KvPair>, nss_line: KvPair) -> Result<(), KvError> {
    let mut pam = open_or_create(&paths.pam_radius())?;
    let mut nss = KvStore::open(paths.nsswitch())?;
    let pam_before: Vec<KvPair> = pam.all().to_vec();

    pam.delete_by_key(PAM_KEY)?;
    if let Some(line) = pam_line {
        pam.add_kv_pair(line)?;
    }
    nss.delete_by_key(NSS_KEY)?;
    nss.add_kv_pair(nss_line)?;

    pam.sync()?;
    if let Err(err) = nss.close() {
        pam.delete_all();
        for pair in pam_before {
            pam.add_kv_pair(pair)?;
        }
        if let Err(restore) = pam.sync() {
            tracing::error!(error = %restore, "Failed to restore PAM RADIUS entry");
        }
        return Err(err);
    }
    pam.close()
}

/// Whether RADIUS is active according to the PAM file at `path`.
pub fn pam_status(path: &Path) -> Result<bool, KvError> {
    let store = KvStore::open(path)?;
    let mut enabled = false;
    for pair in store.get_kv_pairs(PAM_KEY) {
        if pair.values.len() < 2 {
            return Err(KvError::NotFound(format!(
                "{}: PAM RADIUS entry corrupted",
                path.display()
            )));
        }
        enabled = pair.values[1] == PAM_MODULE
            && (pair.values[0] == PAM_SUFFICIENT || pair.values[0] == PAM_REQUIRED);
    }
    Ok(enabled)
}

/// Legacy firmware only ever wrote `sufficient` entries.
pub fn legacy_pam_status(path: &Path) -> Result<bool, KvError> {
    let store = KvStore::open(path)?;
    Ok(store
        .get_kv_pairs(PAM_KEY)
        .last()
        .map(|p| p.values.len() >= 2 && p.values[0] == PAM_SUFFICIENT && p.values[1] == PAM_MODULE)
        .unwrap_or(false))
}
