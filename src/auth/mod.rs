//! Request authentication.
//!
//! # Data Flow
//! ```text
//! Basic credentials
//!     → RadiusClient::authenticate   (when RADIUS is enabled)
//!     → LocalAuthenticator::verify   (RADIUS disabled, or fallback allowed and RADIUS did not authenticate)
//!     → AuthOutcome { authenticated, authorized, errors }
//! ```
//!
//! # Design Decisions
//! - The RADIUS policy (enabled, fallback, servers) is read from the live tree per request
//! - Backend failures are reported separately from rejected credentials
//! - When no privilege check is requested, authenticated implies authorized

pub mod local;

use std::sync::Arc;

use thiserror::Error;

use crate::aaa::radius::{RadiusClient, RadiusConfig};

pub use local::{CommandLocalAuthenticator, LocalAuthenticator, LocalVerdict};

/// Failure of an authentication backend. A rejected password is not an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no RADIUS server is configured")]
    NoServerConfigured,

    #[error("failed to authenticate with any RADIUS server: {}", .errors.join("; "))]
    NoServerReachable { errors: Vec<String> },

    #[error("timed out while waiting for an answer: {}", .errors.join("; "))]
    Timeout { errors: Vec<String> },

    #[error("local authentication failed: {0}")]
    Local(String),
}

impl AuthError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthError::Timeout { .. })
    }
}

/// What the caller asked to be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthPolicy {
    pub use_radius: bool,
    pub allow_fallback: bool,
    pub require_privilege: bool,
}

impl AuthPolicy {
    pub fn from_radius(radius: &RadiusConfig, require_privilege: bool) -> Self {
        Self {
            use_radius: radius.enabled,
            allow_fallback: radius.fallback,
            require_privilege,
        }
    }
}

/// Result of one authentication attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub authorized: bool,
    pub errors: Vec<AuthError>,
}

/// RADIUS first, local accounts as configured fallback.
#[derive(Clone)]
pub struct Authenticator {
    radius: RadiusClient,
    local: Arc<dyn LocalAuthenticator>,
}

impl Authenticator {
    pub fn new(radius: RadiusClient, local: Arc<dyn LocalAuthenticator>) -> Self {
        Self { radius, local }
    }

    pub fn radius(&self) -> &RadiusClient {
        &self.radius
    }

    pub async fn authenticate(
        &self,
        policy: AuthPolicy,
        radius: &RadiusConfig,
        username: &str,
        password: &str,
    ) -> AuthOutcome {
        let mut outcome = AuthOutcome::default();

        if policy.use_radius {
            match self.radius.authenticate(&radius.servers, username, password).await {
                Ok(verdict) => {
                    outcome.authenticated = verdict.authenticated;
                    outcome.authorized = verdict.authenticated
                        && (!policy.require_privilege || verdict.privileged);
                }
                Err(e) => {
                    tracing::warn!(user = %username, error = %e, "RADIUS authentication failed");
                    outcome.errors.push(e);
                }
            }
        }

        if !policy.use_radius || (policy.allow_fallback && !outcome.authenticated) {
            outcome = AuthOutcome::default();
            match self.local.verify(username, password).await {
                Ok(verdict) => {
                    outcome.authenticated = verdict.authenticated;
                    outcome.authorized = verdict.authenticated
                        && (!policy.require_privilege || verdict.privileged);
                }
                Err(e) => {
                    tracing::warn!(user = %username, error = %e, "Local authentication failed");
                    outcome.errors.push(e);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aaa::radius::{RadiusAnswer, RadiusServer, RadiusTransport, TransportError};
    use async_trait::async_trait;

    struct FixedTransport(Result<RadiusAnswer, TransportError>);

    #[async_trait]
    impl RadiusTransport for FixedTransport {
        async fn access_request(
            &self,
            _server: &RadiusServer,
            _username: &str,
            _password: &str,
        ) -> Result<RadiusAnswer, TransportError> {
            self.0.clone()
        }
    }

    struct FixedLocal(LocalVerdict);

    #[async_trait]
    impl LocalAuthenticator for FixedLocal {
        async fn verify(&self, _username: &str, _password: &str) -> Result<LocalVerdict, AuthError> {
            Ok(self.0)
        }
    }

    fn radius_cfg(enabled: bool, fallback: bool) -> RadiusConfig {
        RadiusConfig {
            enabled,
            fallback,
            servers: vec![RadiusServer {
                ip: "10.0.0.1".into(),
                secret: "s".into(),
                port: 1812,
            }],
        }
    }

    fn authenticator(radius: Result<RadiusAnswer, TransportError>, local: LocalVerdict) -> Authenticator {
        Authenticator::new(
            RadiusClient::new(Arc::new(FixedTransport(radius))),
            Arc::new(FixedLocal(local)),
        )
    }

    const LOCAL_ADMIN: LocalVerdict = LocalVerdict { authenticated: true, privileged: true };
    const LOCAL_REJECT: LocalVerdict = LocalVerdict { authenticated: false, privileged: false };

    #[tokio::test]
    async fn test_radius_disabled_uses_local() {
        let auth = authenticator(Err(TransportError::Timeout), LOCAL_ADMIN);
        let cfg = radius_cfg(false, false);
        let out = auth
            .authenticate(AuthPolicy::from_radius(&cfg, true), &cfg, "admin", "pw")
            .await;
        assert!(out.authenticated && out.authorized);
        assert!(out.errors.is_empty());
    }

    #[tokio::test]
    async fn test_radius_error_without_fallback_is_reported() {
        let auth = authenticator(Err(TransportError::Timeout), LOCAL_ADMIN);
        let cfg = radius_cfg(true, false);
        let out = auth
            .authenticate(AuthPolicy::from_radius(&cfg, true), &cfg, "admin", "pw")
            .await;
        assert!(!out.authenticated);
        assert!(out.errors[0].is_timeout());
    }

    #[tokio::test]
    async fn test_radius_reject_falls_back_when_allowed() {
        let reject = Ok(RadiusAnswer { accepted: false, privilege: 0 });
        let cfg = radius_cfg(true, true);

        let out = authenticator(reject.clone(), LOCAL_ADMIN)
            .authenticate(AuthPolicy::from_radius(&cfg, true), &cfg, "admin", "pw")
            .await;
        assert!(out.authenticated && out.authorized);

        let out = authenticator(reject, LOCAL_REJECT)
            .authenticate(AuthPolicy::from_radius(&cfg, true), &cfg, "admin", "bad")
            .await;
        assert!(!out.authenticated);
        assert!(out.errors.is_empty());
    }

    #[tokio::test]
    async fn test_privilege_only_checked_when_requested() {
        let user = Ok(RadiusAnswer { accepted: true, privilege: 1 });
        let cfg = radius_cfg(true, false);

        let out = authenticator(user.clone(), LOCAL_REJECT)
            .authenticate(AuthPolicy::from_radius(&cfg, true), &cfg, "bob", "pw")
            .await;
        assert!(out.authenticated);
        assert!(!out.authorized);

        let out = authenticator(user, LOCAL_REJECT)
            .authenticate(AuthPolicy::from_radius(&cfg, false), &cfg, "bob", "pw")
            .await;
        assert!(out.authorized);
    }
}
