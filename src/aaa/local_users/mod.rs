//! Locally managed OS accounts.
//!
//! # Data Flow
//! ```text
//! LocalUsers (desired list)
//!     → verify()          (names, reserved accounts, passwords, privilege)
//!     → save(old)         (carry the default admin forward from `old`)
//!     → reconcile()       (pstree/userdel for removals, then passwd → shadow → group)
//! ```
//!
//! # Design Decisions
//! - Only uids at or above 1000 are managed; system accounts and `radius` are never touched
//! - Privilege is group membership: admins are also in the admin group
//! - Reconciliation stops at the first failure instead of accumulating

pub mod accounts;
pub mod reconcile;
pub mod user;

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::section::{ConfigDiff, Section, SectionKind};
use crate::system::{AccountSettings, SystemContext, SystemPaths};

pub use user::{valid_username, Privilege, User, DEFAULT_ADMIN, DEFAULT_ADMIN_HASH, RESERVED_RADIUS};

/// The list of local accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalUsers(pub Vec<User>);

impl LocalUsers {
    pub fn users(&self) -> &[User] {
        &self.0
    }

    pub fn find(&self, username: &str) -> Option<&User> {
        self.0.iter().find(|u| u.username == username)
    }

    pub fn find_mut(&mut self, username: &str) -> Option<&mut User> {
        self.0.iter_mut().find(|u| u.username == username)
    }

    /// Remove every named user that exists.
    ///
    /// Names that match nothing come back as [`Error::NotFound`]; the rest
    /// are still removed.
    pub fn remove_users(&mut self, names: &[String]) -> Vec<Error> {
        let present: HashSet<&str> = self.0.iter().map(|u| u.username.as_str()).collect();
        let missing: Vec<Error> = names
            .iter()
            .filter(|n| !present.contains(n.as_str()))
            .map(|n| Error::NotFound(n.clone()))
            .collect();

        self.0.retain(|u| !names.contains(&u.username));
        missing
    }

    /// Append new users. Nothing is added if any name already exists.
    pub fn add_users(&mut self, users: Vec<User>) -> Result<(), Vec<Error>> {
        let existing: Vec<Error> = users
            .iter()
            .filter(|u| self.find(&u.username).is_some())
            .map(|u| Error::validation(format!("user {} already exists on the system", u.username)))
            .collect();
        if !existing.is_empty() {
            return Err(existing);
        }
        self.0.extend(users);
        Ok(())
    }
}

/// Verification rules for one user.
pub fn verify_user(user: &User) -> Vec<Error> {
    let mut errors = Vec::new();
    let name = &user.username;

    if name.is_empty() {
        errors.push(Error::validation("empty username"));
    } else {
        if user.is_default_admin() && user.privilege != Privilege::Admin {
            errors.push(Error::validation(format!(
                "cannot change reserved user's privilege level: {}",
                name
            )));
        } else if name == RESERVED_RADIUS {
            errors.push(Error::validation(format!("cannot add reserved user: {}", name)));
        }
        if !valid_username(name) {
            errors.push(Error::validation(format!("invalid username: {}", name)));
        }
    }

    if user.password.is_empty() {
        errors.push(Error::validation(format!("empty password for user: {}", name)));
    }
    if let Privilege::Invalid(level) = user.privilege {
        errors.push(Error::validation(format!(
            "bad privilege level {} of user: {}",
            level, name
        )));
    }
    errors
}

#[async_trait]
impl Section for LocalUsers {
    const KIND: SectionKind = SectionKind::LocalUsers;

    fn verify(&self) -> Vec<Error> {
        let mut errors: Vec<Error> = self.0.iter().flat_map(verify_user).collect();

        let mut seen = HashSet::new();
        for user in &self.0 {
            if !user.username.is_empty() && !seen.insert(user.username.as_str()) {
                errors.push(Error::validation(format!("duplicate user: {}", user.username)));
            }
        }
        errors
    }

    async fn save(&mut self, old: &Self, ctx: &SystemContext) -> Vec<Error> {
        if !self.0.iter().any(User::is_default_admin) {
            if let Some(admin) = old.find(DEFAULT_ADMIN) {
                self.0.push(admin.clone());
            }
        }

        for change in old.diff(self).changes() {
            tracing::debug!(change = %change, "Local users change");
        }

        match reconcile::reconcile(&mut self.0, ctx).await {
            Ok(()) => Vec::new(),
            Err(e) => vec![e],
        }
    }

    fn factory(&mut self) {
        self.0 = vec![User::default_admin()];
    }

    fn legacy(&mut self, root: &Path) {
        match accounts::read_users(&SystemPaths::new(root), &AccountSettings::default()) {
            Ok(users) => self.0 = users,
            Err(e) => tracing::error!(error = %e, "Legacy[aaa/localusers]: failed to read accounts"),
        }
    }

    fn diff(&self, other: &Self) -> ConfigDiff {
        let mut diff = ConfigDiff::new();
        diff.keyed_list("users", &self.0, &other.0, |u| u.username.clone());
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::ChangeKind;

    fn alice() -> User {
        User::new("alice", "x", Privilege::User)
    }

    #[test]
    fn test_factory_is_single_admin() {
        let users = LocalUsers::factory_default();
        assert_eq!(users.users(), &[User::default_admin()]);
        assert!(users.verify().is_empty());
    }

    #[test]
    fn test_verify_rules() {
        let users = LocalUsers(vec![
            User::new("admin", "h", Privilege::User),
            User::new("radius", "h", Privilege::User),
            User::new("Bad-Name", "h", Privilege::User),
            User::new("", "", Privilege::Invalid(9)),
            alice(),
            alice(),
        ]);
        let errors = users.verify();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "cannot change reserved user's privilege level: admin",
                "cannot add reserved user: radius",
                "invalid username: Bad-Name",
                "empty username",
                "empty password for user: ",
                "bad privilege level 9 of user: ",
                "duplicate user: alice",
            ]
        );
        assert_eq!(users.verify(), errors);
    }

    #[test]
    fn test_partial_remove() {
        let mut users = LocalUsers(vec![User::default_admin(), alice()]);
        let notices = users.remove_users(&["alice".to_string(), "ghost".to_string()]);
        assert_eq!(notices, vec![Error::NotFound("ghost".into())]);
        assert_eq!(users.users(), &[User::default_admin()]);
    }

    #[test]
    fn test_add_existing_user_rejected() {
        let mut users = LocalUsers(vec![User::default_admin(), alice()]);
        let err = users.add_users(vec![User::new("bob", "y", Privilege::Admin), alice()]);
        assert_eq!(err.unwrap_err().len(), 1);
        assert_eq!(users.users().len(), 2);

        users.add_users(vec![User::new("bob", "y", Privilege::Admin)]).unwrap();
        assert_eq!(users.users().len(), 3);
    }

    #[test]
    fn test_diff_by_username() {
        let old = LocalUsers(vec![User::default_admin(), alice()]);
        let mut new = old.clone();
        new.0[1].privilege = Privilege::Admin;
        new.0.push(User::new("bob", "y", Privilege::User));

        let diff = old.diff(&new);
        assert_eq!(diff.entry_change("users", "admin"), Some(ChangeKind::Unchanged));
        assert_eq!(diff.entry_change("users", "alice"), Some(ChangeKind::Updated));
        assert_eq!(diff.entry_change("users", "bob"), Some(ChangeKind::Added));
    }

    #[test]
    fn test_legacy_missing_tree_keeps_users() {
        let mut users = LocalUsers::factory_default();
        users.legacy(Path::new("/nonexistent/legacy-root"));
        assert_eq!(users, LocalUsers::factory_default());
    }
}
