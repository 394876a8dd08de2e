//! Local account authentication boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::system::{Shell, ShellError};

use super::AuthError;

/// Result of checking a local account's password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalVerdict {
    pub authenticated: bool,
    /// Member of the administrative group.
    pub privileged: bool,
}

#[async_trait]
pub trait LocalAuthenticator: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<LocalVerdict, AuthError>;
}

/// Delegates the password check to a helper program.
///
/// The helper receives the username as its only argument and the password on
/// stdin; exit status 0 means the password is valid. Group membership is
/// read with `id -nG`.
pub struct CommandLocalAuthenticator {
    program: String,
    admin_group: String,
    shell: Arc<dyn Shell>,
}

impl CommandLocalAuthenticator {
    pub fn new(program: impl Into<String>, admin_group: impl Into<String>, shell: Arc<dyn Shell>) -> Self {
        Self {
            program: program.into(),
            admin_group: admin_group.into(),
            shell,
        }
    }
}

#[async_trait]
impl LocalAuthenticator for CommandLocalAuthenticator {
    async fn verify(&self, username: &str, password: &str) -> Result<LocalVerdict, AuthError> {
        let checked = self
            .shell
            .output(&self.program, &[username], Some(password))
            .await
            .map_err(|e| AuthError::Local(e.to_string()))?;
        if !checked.success() {
            return Ok(LocalVerdict::default());
        }

        let groups = match self.shell.run("id", &["-nG", username], None).await {
            Ok(out) => out.stdout,
            Err(ShellError::Failed { output, .. }) => {
                return Err(AuthError::Local(format!("cannot read groups of {}: {}", username, output.trim())))
            }
            Err(e) => return Err(AuthError::Local(e.to_string())),
        };

        Ok(LocalVerdict {
            authenticated: true,
            privileged: groups.split_whitespace().any(|g| g == self.admin_group),
        })
    }
}
