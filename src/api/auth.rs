//! Request authentication and loopback gating.
//!
//! Loopback callers are trusted. Everyone else presents HTTP Basic
//! credentials, checked against the live RADIUS policy. Safe methods need
//! any authenticated user; everything else needs an administrator.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::auth::AuthPolicy;
use crate::http::server::AppState;

use super::error::ApiError;

const REALM: &str = "Basic realm=\"appliance\"";

/// Who is making the request. Used as the admission lock holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
    pub privileged: bool,
}

impl Caller {
    fn local(addr: &SocketAddr) -> Self {
        Self {
            name: format!("local:{}", addr.ip()),
            privileged: true,
        }
    }
}

pub fn is_loopback(addr: &SocketAddr) -> bool {
    addr.ip().to_canonical().is_loopback()
}

/// Decode `Authorization: Basic ...` into username and password.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

pub async fn authenticate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_loopback(&addr) {
        request.extensions_mut().insert(Caller::local(&addr));
        return next.run(request).await;
    }

    let Some((username, password)) = basic_credentials(request.headers()) else {
        return unauthorized();
    };

    let require_privilege = !request.method().is_safe();
    let radius = state.engine.snapshot().aaa.radius.clone();
    let policy = AuthPolicy::from_radius(&radius, require_privilege);
    let outcome = state
        .authenticator
        .authenticate(policy, &radius, &username, &password)
        .await;

    if outcome.authenticated {
        if !outcome.authorized {
            tracing::info!(user = %username, client = %addr, "Privileged request refused");
            return StatusCode::FORBIDDEN.into_response();
        }
        request.extensions_mut().insert(Caller {
            name: username,
            privileged: require_privilege,
        });
        return next.run(request).await;
    }

    match outcome.errors.into_iter().next() {
        Some(err) => ApiError::from(err).into_response(),
        None => {
            tracing::info!(user = %username, client = %addr, "Authentication rejected");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, REALM)]).into_response()
}

/// Hide local-only endpoints from remote callers.
pub async fn loopback_only(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if is_loopback(&addr) {
        next.run(request).await
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWRtaW46czNjcjp0"));
        assert_eq!(
            basic_credentials(&headers),
            Some(("admin".to_string(), "s3cr:t".to_string()))
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(basic_credentials(&headers), None);
    }

    #[test]
    fn test_loopback_detection() {
        assert!(is_loopback(&"127.0.0.1:5000".parse().unwrap()));
        assert!(is_loopback(&"[::1]:5000".parse().unwrap()));
        assert!(is_loopback(&"[::ffff:127.0.0.1]:5000".parse().unwrap()));
        assert!(!is_loopback(&"10.0.0.7:5000".parse().unwrap()));
    }
}
