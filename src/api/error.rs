//! Mapping engine errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::engine::{CommitError, StorageError};
use crate::error::{Error, ErrorKind};

/// An error response: a status code and a `{"errors": [...]}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    errors: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, errors: Vec<String>) -> Self {
        Self { status, errors }
    }

    pub fn from_errors(errors: &[Error]) -> Self {
        Self {
            status: status_for(errors),
            errors: errors.iter().map(Error::to_string).collect(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::from_errors(&[Error::Internal(msg.into())])
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

fn kind_status(error: &Error) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ExternalAuth => match error {
            Error::ExternalAuth(auth) => auth_status(auth),
            _ => StatusCode::BAD_GATEWAY,
        },
        ErrorKind::Persistence | ErrorKind::Rollback | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Status for an authentication backend failure.
pub fn auth_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        AuthError::NoServerConfigured | AuthError::NoServerReachable { .. } => StatusCode::BAD_GATEWAY,
        AuthError::Local(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The status of the most severe error in `errors`.
///
/// Server-side failures outrank gateway failures, which outrank conflicts,
/// missing entities and finally bad input.
pub fn status_for(errors: &[Error]) -> StatusCode {
    fn rank(status: StatusCode) -> u8 {
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => 5,
            StatusCode::GATEWAY_TIMEOUT => 4,
            StatusCode::BAD_GATEWAY => 3,
            StatusCode::CONFLICT => 2,
            StatusCode::NOT_FOUND => 1,
            _ => 0,
        }
    }

    errors
        .iter()
        .map(kind_status)
        .max_by_key(|s| rank(*s))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        Self::from_errors(&err.errors())
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from_errors(&[err])
    }
}

impl From<Vec<Error>> for ApiError {
    fn from(errors: Vec<Error>) -> Self {
        Self::from_errors(&errors)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(auth_status(&err), vec![err.to_string()])
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Configuration storage failed");
        Self::from_errors(&[Error::persistence(err.to_string())])
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), vec![rejection.body_text()])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), vec![rejection.body_text()])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "errors": self.errors }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        assert_eq!(status_for(&[Error::validation("bad")]), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&[Error::NotFound("ghost".into())]), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&[Error::Conflict { holder: "10.0.0.5".into() }]),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&[Error::ExternalAuth(AuthError::Timeout { errors: vec![] })]),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&[Error::ExternalAuth(AuthError::NoServerConfigured)]),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&[Error::Rollback("x".into())]),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_most_severe_wins() {
        let errors = vec![
            Error::validation("bad"),
            Error::persistence("disk full"),
            Error::NotFound("ghost".into()),
        ];
        assert_eq!(status_for(&errors), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_failed_commit_lists_rollback_errors() {
        let err: ApiError = CommitError::Failed {
            errors: vec![Error::persistence("userdel failed")],
            rollback: vec![Error::persistence("shadow unwritable").into_rollback()],
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.errors(),
            ["userdel failed", "rollback failed: shadow unwritable"]
        );
    }
}
