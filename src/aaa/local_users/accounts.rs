//! Colon-delimited account database files: passwd, shadow, group.
//!
//! Lines that do not parse are preserved verbatim when a file is rewritten.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::system::{AccountSettings, SystemPaths};

use super::user::{Privilege, User, MANAGED_UID_MIN, RESERVED_RADIUS};

/// passwd field marking a locked account.
pub const PASSWD_LOCKED: &str = "!";
/// passwd field meaning "look in shadow".
pub const PASSWD_SHADOW: &str = "x";
/// passwd fields for accounts that cannot log in.
pub const PASSWD_NOLOGIN: [&str; 2] = ["*", "*NP*"];

/// Shadow aging fields appended to new entries.
const SHADOW_AGING: &str = "99999:0:99999:7:::";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{file}: no entry for group {group}")]
    MissingGroup { file: PathBuf, group: String },
}

pub fn read_lines(path: &Path) -> Result<Vec<String>, AccountError> {
    let data = fs::read_to_string(path).map_err(|source| AccountError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(data.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
}

/// Rewrite `path` in place. The file keeps its ownership and mode.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<(), AccountError> {
    let mut data = lines.join("\n");
    if !data.is_empty() {
        data.push('\n');
    }
    fs::write(path, data).map_err(|source| AccountError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `name:password:uid:gid:gecos:home:shell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub password: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub home: String,
    pub shell: String,
}

impl PasswdEntry {
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 3 {
            return None;
        }
        let field = |idx: usize| fields.get(idx).copied().unwrap_or_default().to_string();
        Some(Self {
            name: fields[0].to_string(),
            password: fields[1].to_string(),
            uid: fields[2].parse().ok()?,
            gid: fields.get(3).and_then(|g| g.parse().ok()).unwrap_or(0),
            gecos: field(4),
            home: field(5),
            shell: field(6),
        })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.password, self.uid, self.gid, self.gecos, self.home, self.shell
        )
    }

    /// Inside the uid range this engine owns, and not the RADIUS account.
    pub fn is_managed(&self) -> bool {
        self.uid >= MANAGED_UID_MIN && self.name != RESERVED_RADIUS
    }

    pub fn can_login(&self) -> bool {
        !PASSWD_NOLOGIN.contains(&self.password.as_str())
    }
}

/// `name:hash:aging...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    pub name: String,
    pub hash: String,
    rest: String,
}

impl ShadowEntry {
    pub fn new(name: &str, hash: &str) -> Self {
        Self {
            name: name.to_string(),
            hash: hash.to_string(),
            rest: SHADOW_AGING.to_string(),
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(3, ':');
        let name = fields.next()?;
        let hash = fields.next()?;
        Some(Self {
            name: name.to_string(),
            hash: hash.to_string(),
            rest: fields.next().unwrap_or_default().to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}:{}:{}", self.name, self.hash, self.rest)
    }
}

/// `name:password:gid:member,member`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub password: String,
    pub gid: u32,
    pub members: Vec<String>,
}

impl GroupEntry {
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 4 {
            return None;
        }
        Some(Self {
            name: fields[0].to_string(),
            password: fields[1].to_string(),
            gid: fields[2].parse().ok()?,
            members: fields[3]
                .split(',')
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}:{}:{}:{}", self.name, self.password, self.gid, self.members.join(","))
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

/// Look up a group's gid.
pub fn group_gid(group_lines: &[String], group: &str) -> Option<u32> {
    group_lines
        .iter()
        .filter_map(|l| GroupEntry::parse(l))
        .find(|g| g.name == group)
        .map(|g| g.gid)
}

/// Managed passwd entries that can log in, in file order.
pub fn managed_entries(passwd_lines: &[String]) -> Vec<PasswdEntry> {
    passwd_lines
        .iter()
        .filter_map(|l| PasswdEntry::parse(l))
        .filter(|e| e.is_managed() && e.can_login())
        .collect()
}

/// Read the managed accounts of the tree at `paths`.
///
/// Passwords are taken from shadow when passwd defers to it; privilege is
/// membership of the admin group.
pub fn read_users(paths: &SystemPaths, accounts: &AccountSettings) -> Result<Vec<User>, AccountError> {
    let passwd = read_lines(&paths.passwd())?;
    let entries = managed_entries(&passwd);
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let hashes: HashMap<String, String> = read_lines(&paths.shadow())?
        .iter()
        .filter_map(|l| ShadowEntry::parse(l))
        .map(|s| (s.name, s.hash))
        .collect();
    let admins: Vec<String> = read_lines(&paths.group())?
        .iter()
        .filter_map(|l| GroupEntry::parse(l))
        .find(|g| g.name == accounts.admin_group)
        .map(|g| g.members)
        .unwrap_or_default();

    Ok(entries
        .into_iter()
        .map(|entry| {
            let password = match entry.password.as_str() {
                PASSWD_SHADOW => hashes.get(&entry.name).cloned().unwrap_or_default(),
                PASSWD_LOCKED => String::new(),
                other => other.to_string(),
            };
            let privilege = if admins.contains(&entry.name) {
                Privilege::Admin
            } else {
                Privilege::User
            };
            User {
                uid: Some(entry.uid),
                ..User::new(entry.name, password, privilege)
            }
        })
        .collect())
}
