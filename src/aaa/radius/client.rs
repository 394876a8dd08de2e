//! RADIUS authentication with ordered failover.
//!
//! Servers are tried in list order. The first server that answers, accept or
//! reject, ends the attempt. Servers that time out or fail are skipped and
//! only reported if no server answers at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::AuthError;
use crate::observability::metrics;
use crate::system::{Shell, ShellError};

use super::config::RadiusServer;

/// Privilege level a server reports for administrators.
pub const ADMIN_PRIVILEGE_LEVEL: u8 = 2;

/// Per-server failure. Never returned for an explicit reject.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out while waiting for an answer")]
    Timeout,

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A server's answer to an Access-Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusAnswer {
    pub accepted: bool,
    pub privilege: u8,
}

/// Outcome of [`RadiusClient::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadiusVerdict {
    pub authenticated: bool,
    pub privileged: bool,
}

/// Sends one Access-Request to one server.
#[async_trait]
pub trait RadiusTransport: Send + Sync {
    async fn access_request(
        &self,
        server: &RadiusServer,
        username: &str,
        password: &str,
    ) -> Result<RadiusAnswer, TransportError>;
}

/// Failover client over a [`RadiusTransport`].
#[derive(Clone)]
pub struct RadiusClient {
    transport: Arc<dyn RadiusTransport>,
}

impl RadiusClient {
    pub fn new(transport: Arc<dyn RadiusTransport>) -> Self {
        Self { transport }
    }

    pub async fn authenticate(
        &self,
        servers: &[RadiusServer],
        username: &str,
        password: &str,
    ) -> Result<RadiusVerdict, AuthError> {
        if servers.is_empty() {
            return Err(AuthError::NoServerConfigured);
        }

        let mut failures = Vec::new();
        for server in servers {
            let address = server.address();
            match self.transport.access_request(server, username, password).await {
                Ok(answer) => {
                    metrics::record_radius_attempt(
                        &address,
                        if answer.accepted { "accept" } else { "reject" },
                    );
                    return Ok(RadiusVerdict {
                        authenticated: answer.accepted,
                        privileged: answer.accepted && answer.privilege == ADMIN_PRIVILEGE_LEVEL,
                    });
                }
                Err(e) => {
                    metrics::record_radius_attempt(&address, "error");
                    tracing::warn!(server = %address, error = %e, "RADIUS server failed, trying next");
                    failures.push((address, e));
                }
            }
        }

        let all_timed_out = failures.iter().all(|(_, e)| *e == TransportError::Timeout);
        let errors = failures
            .into_iter()
            .map(|(address, e)| format!("{}: {}", address, e))
            .collect();
        if all_timed_out {
            Err(AuthError::Timeout { errors })
        } else {
            Err(AuthError::NoServerReachable { errors })
        }
    }
}

/// Drives the FreeRADIUS `radclient` utility.
pub struct RadclientTransport {
    program: String,
    timeout: Duration,
    retries: u32,
    shell: Arc<dyn Shell>,
}

impl RadclientTransport {
    pub fn new(program: impl Into<String>, timeout: Duration, retries: u32, shell: Arc<dyn Shell>) -> Self {
        Self {
            program: program.into(),
            timeout,
            retries,
            shell,
        }
    }

    fn quote(value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }

    /// Classify radclient output.
    pub fn parse_reply(output: &str) -> Result<RadiusAnswer, TransportError> {
        let privilege = if output.lines().any(|l| {
            let mut parts = l.split('=').map(str::trim);
            parts.next() == Some("Service-Type") && parts.next() == Some("Administrative-User")
        }) {
            ADMIN_PRIVILEGE_LEVEL
        } else {
            1
        };

        if output.contains("Access-Accept") {
            Ok(RadiusAnswer { accepted: true, privilege })
        } else if output.contains("Access-Reject") {
            Ok(RadiusAnswer { accepted: false, privilege: 0 })
        } else if output.contains("No reply from server") {
            Err(TransportError::Timeout)
        } else {
            Err(TransportError::Protocol(output.trim().to_string()))
        }
    }
}

#[async_trait]
impl RadiusTransport for RadclientTransport {
    async fn access_request(
        &self,
        server: &RadiusServer,
        username: &str,
        password: &str,
    ) -> Result<RadiusAnswer, TransportError> {
        let attributes = format!(
            "User-Name = {}\nUser-Password = {}\n",
            Self::quote(username),
            Self::quote(password)
        );
        let timeout = self.timeout.as_secs().max(1).to_string();
        let retries = self.retries.max(1).to_string();
        let address = server.address();
        let args = [
            "-x",
            "-t",
            timeout.as_str(),
            "-r",
            retries.as_str(),
            address.as_str(),
            "auth",
            server.secret.as_str(),
        ];

        match self.shell.output(&self.program, &args, Some(&attributes)).await {
            Ok(out) => Self::parse_reply(&out.combined()),
            Err(ShellError::Timeout { .. }) => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::Unreachable(e.to_string())),
        }
    }
}
