//! Engine-wide error taxonomy.
//!
//! Every Verify/Save/handler path reports failures as [`Error`] values.
//! Sections accumulate them in a `Vec<Error>` instead of short-circuiting,
//! so a caller always sees every violated invariant in one response.

use thiserror::Error;

use crate::auth::AuthError;

/// Broad classification used for status mapping and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Persistence,
    Rollback,
    NotFound,
    Conflict,
    ExternalAuth,
    Internal,
}

/// A single configuration error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// User input violates an invariant. Never has external side effects.
    #[error("{0}")]
    Validation(String),

    /// An external write or command failed during Save.
    #[error("{0}")]
    Persistence(String),

    /// The compensating Save after a failed commit failed as well.
    #[error("rollback failed: {0}")]
    Rollback(String),

    /// A named entity (user, server) does not exist.
    #[error("[{0}] is not configured")]
    NotFound(String),

    /// The admission lock is held by another client.
    #[error("configuration is locked by {holder}")]
    Conflict { holder: String },

    /// The authentication backend was unreachable or failed.
    #[error(transparent)]
    ExternalAuth(#[from] AuthError),

    /// Programming error surfaced without crashing the process.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Error::Persistence(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Persistence(_) => ErrorKind::Persistence,
            Error::Rollback(_) => ErrorKind::Rollback,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::ExternalAuth(_) => ErrorKind::ExternalAuth,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Re-tag a Save-time error as a failure of the rollback attempt.
    pub fn into_rollback(self) -> Self {
        match self {
            Error::Rollback(_) => self,
            other => Error::Rollback(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_wraps_message_once() {
        let err = Error::persistence("write /etc/shadow: permission denied").into_rollback();
        assert_eq!(err.kind(), ErrorKind::Rollback);
        assert_eq!(
            err.to_string(),
            "rollback failed: write /etc/shadow: permission denied"
        );
        assert_eq!(err.clone().into_rollback(), err);
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(Error::NotFound("ghost".into()).to_string(), "[ghost] is not configured");
    }
}
