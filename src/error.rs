// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Request-level failures and their mapping to HTTP responses.

use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, Response, StatusCode};
use log::warn;

use crate::storage::StorageError;

/// A request could not be answered with a regular response.
///
/// Per-property problems (unknown or inapplicable properties) are never errors; they are
/// reported inside an otherwise successful multistatus response.
#[derive(thiserror::Error, Debug)]
pub enum DavError {
    /// The caller lacks the permissions for the requested operation.
    ///
    /// Anonymous callers are asked to authenticate instead.
    #[error("access to the requested resource is not allowed")]
    NotAllowed,

    #[error("access to the requested resource is forbidden")]
    Forbidden,

    #[error("the requested resource does not exist")]
    NotFound,

    #[error("etag precondition not verified")]
    PreconditionFailed,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("client timed out reading request body")]
    Timeout,

    #[error("method {0} is not supported")]
    MethodNotAllowed(http::Method),

    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl From<StorageError> for DavError {
    fn from(value: StorageError) -> Self {
        DavError::Internal(Box::new(value))
    }
}

impl From<http::Error> for DavError {
    fn from(value: http::Error) -> Self {
        DavError::Internal(Box::new(value))
    }
}

impl From<std::io::Error> for DavError {
    fn from(value: std::io::Error) -> Self {
        DavError::Internal(Box::new(value))
    }
}

impl From<roxmltree::Error> for DavError {
    fn from(value: roxmltree::Error) -> Self {
        DavError::BadRequest(format!("invalid XML in request body: {value}"))
    }
}

/// Result type used throughout request handling.
pub type Result<T, E = DavError> = std::result::Result<T, E>;

impl DavError {
    /// Status code of the response for this error.
    ///
    /// `authenticated` only matters for [`DavError::NotAllowed`].
    #[must_use]
    pub fn status(&self, authenticated: bool) -> StatusCode {
        match self {
            DavError::NotAllowed if authenticated => StatusCode::FORBIDDEN,
            DavError::NotAllowed => StatusCode::UNAUTHORIZED,
            DavError::Forbidden => StatusCode::FORBIDDEN,
            DavError::NotFound => StatusCode::NOT_FOUND,
            DavError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            DavError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DavError::Timeout => StatusCode::REQUEST_TIMEOUT,
            DavError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DavError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            DavError::NotAllowed | DavError::Forbidden => {
                "Access to the requested resource forbidden."
            }
            DavError::NotFound => "The requested resource could not be found.",
            DavError::PreconditionFailed => "Precondition failed.",
            DavError::BadRequest(_) => "Bad Request",
            DavError::Timeout => "Connection timed out",
            DavError::MethodNotAllowed(_) => "The method is not allowed on the requested resource.",
            DavError::Internal(_) => "A server error occurred.  Please contact the administrator.",
        }
    }

    /// Build the response sent to the client.
    ///
    /// The body is a fixed plain text message; details of the error are never included.
    #[must_use]
    pub fn into_response(self, user: Option<&str>, realm: &str) -> Response<String> {
        let status = self.status(user.is_some());
        let mut response = Response::new(self.body().to_string());
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        if status == StatusCode::UNAUTHORIZED {
            match HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")) {
                Ok(value) => {
                    response.headers_mut().insert(WWW_AUTHENTICATE, value);
                }
                Err(err) => warn!("Realm cannot be used in a header: {err}"),
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use http::header::WWW_AUTHENTICATE;
    use http::StatusCode;

    use super::DavError;
    use crate::storage::StorageError;

    #[test]
    fn test_not_allowed_depends_on_user() {
        let anonymous = DavError::NotAllowed.into_response(None, "Test realm");
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            anonymous.headers()[WWW_AUTHENTICATE],
            "Basic realm=\"Test realm\""
        );

        let alice = DavError::NotAllowed.into_response(Some("alice"), "Test realm");
        assert_eq!(alice.status(), StatusCode::FORBIDDEN);
        assert!(alice.headers().get(WWW_AUTHENTICATE).is_none());
        assert_eq!(alice.body(), "Access to the requested resource forbidden.");
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = DavError::from(StorageError::NotFound("alice/secret".into()));
        assert!(err.to_string().contains("alice/secret"));
        let response = err.into_response(Some("alice"), "");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body().contains("alice"));
    }

    #[test]
    fn test_forbidden_is_always_403() {
        assert_eq!(DavError::Forbidden.status(false), StatusCode::FORBIDDEN);
        assert_eq!(DavError::Forbidden.status(true), StatusCode::FORBIDDEN);
    }
}
