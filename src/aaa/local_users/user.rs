//! Local account model.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The default administrator. Always present, always [`Privilege::Admin`].
pub const DEFAULT_ADMIN: &str = "admin";

/// Account owned by the RADIUS NSS module. Never managed locally.
pub const RESERVED_RADIUS: &str = "radius";

/// Factory password hash of [`DEFAULT_ADMIN`].
pub const DEFAULT_ADMIN_HASH: &str =
    "$6$CZcv3EIg$7Q2f2vXhYgPupQb0oY58Xd90jk8vcZctKKa5IHY/FI1hlX1upHBYbNv2e1szC7/IbZDanw3LSewxI7buULTPP.";

/// Lowest uid considered locally managed.
pub const MANAGED_UID_MIN: u32 = 1000;

/// uid given to [`DEFAULT_ADMIN`].
pub const ADMIN_UID: u32 = 1000;

/// First uid handed out to new accounts.
pub const FIRST_USER_UID: u32 = 1002;

fn username_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z][a-z0-9]{0,31}$"))
        .as_ref()
        .ok()
}

/// Lowercase alphanumeric, starting with a letter, at most 32 characters.
pub fn valid_username(name: &str) -> bool {
    username_pattern().is_some_and(|re| re.is_match(name))
}

/// Privilege level as carried on the wire (`1` user, `2` admin).
///
/// `0` and absent both mean [`Privilege::User`]. Anything else is kept as
/// [`Privilege::Invalid`] so that verification can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Privilege {
    #[default]
    User,
    Admin,
    Invalid(i64),
}

impl From<i64> for Privilege {
    fn from(level: i64) -> Self {
        match level {
            0 | 1 => Privilege::User,
            2 => Privilege::Admin,
            other => Privilege::Invalid(other),
        }
    }
}

impl From<Privilege> for i64 {
    fn from(privilege: Privilege) -> Self {
        match privilege {
            Privilege::User => 1,
            Privilege::Admin => 2,
            Privilege::Invalid(n) => n,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privilege::User => f.write_str("user"),
            Privilege::Admin => f.write_str("admin"),
            Privilege::Invalid(n) => write!(f, "invalid({})", n),
        }
    }
}

/// One locally managed account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub username: String,

    /// Opaque password hash, written to the shadow file as is.
    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub privilege: Privilege,

    /// Numeric id from the passwd file, when known.
    #[serde(skip)]
    pub uid: Option<u32>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>, privilege: Privilege) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            privilege,
            uid: None,
        }
    }

    /// The factory default administrator.
    pub fn default_admin() -> Self {
        Self {
            uid: Some(ADMIN_UID),
            ..Self::new(DEFAULT_ADMIN, DEFAULT_ADMIN_HASH, Privilege::Admin)
        }
    }

    pub fn is_default_admin(&self) -> bool {
        self.username == DEFAULT_ADMIN
    }

    pub fn is_admin(&self) -> bool {
        self.privilege == Privilege::Admin
    }
}

// The uid is bookkeeping; two users are the same account if everything the
// caller can set matches.
impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password == other.password
            && self.privilege == other.privilege
    }
}

impl Eq for User {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_pattern() {
        assert!(valid_username("alice"));
        assert!(valid_username("a1"));
        assert!(valid_username(&format!("a{}", "b".repeat(31))));
        assert!(!valid_username(&format!("a{}", "b".repeat(32))));
        assert!(!valid_username("Alice"));
        assert!(!valid_username("1alice"));
        assert!(!valid_username("al-ice"));
        assert!(!valid_username(""));
    }

    #[test]
    fn test_privilege_wire_values() {
        let user: User = serde_json::from_str(r#"{"username":"bob","password":"x"}"#).unwrap();
        assert_eq!(user.privilege, Privilege::User);

        let user: User = serde_json::from_str(r#"{"username":"bob","password":"x","privilege":0}"#).unwrap();
        assert_eq!(user.privilege, Privilege::User);

        let user: User = serde_json::from_str(r#"{"username":"bob","password":"x","privilege":7}"#).unwrap();
        assert_eq!(user.privilege, Privilege::Invalid(7));

        let json = serde_json::to_value(User::default_admin()).unwrap();
        assert_eq!(json["privilege"], 2);
        assert!(json.get("uid").is_none());
    }

    #[test]
    fn test_equality_ignores_uid() {
        let mut a = User::new("alice", "x", Privilege::User);
        let b = a.clone();
        a.uid = Some(1002);
        assert_eq!(a, b);
    }
}
