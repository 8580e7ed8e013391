//! Error types for waymark-core

use crate::{Method, StatusCode};
use thiserror::Error;
use waymark_pattern::PatternError;

/// Result type alias for waymark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for route registration, matching and dispatch
#[derive(Debug, Error)]
pub enum Error {
    /// Bad route pattern, raised while registering
    #[error("Route compile error: {0}")]
    Compile(#[from] PatternError),

    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Registration after the router started matching or generating URLs
    #[error("Router is sealed: cannot {0}")]
    Sealed(String),

    /// No route matched method, path and host
    #[error("Route not found: {method} {path}")]
    NotFound { method: Method, path: String },

    /// A route matched the path but not the method
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// URL generation without a required parameter
    #[error("Missing required parameter '{name}' for route '{route}'")]
    MissingParameter { route: String, name: String },

    /// A middleware rejected the request
    #[error("Request rejected by middleware: {reason}")]
    MiddlewareAbort { reason: String, status: StatusCode },

    /// CSRF verification failed
    #[error("CSRF token mismatch")]
    TokenMismatch,

    /// The class loader could not resolve a controller
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// The controller has no such method
    #[error("Method '{method}' not found on {class}")]
    MethodNotFound { class: String, method: String },

    /// A handler failed
    #[error("Handler error: {0}")]
    Handler(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Middleware rejection with a status for the host to render
    pub fn abort(reason: impl Into<String>, status: StatusCode) -> Self {
        Error::MiddlewareAbort {
            reason: reason.into(),
            status,
        }
    }

    /// Wrap any displayable failure raised inside a handler
    pub fn handler(error: impl std::fmt::Display) -> Self {
        Error::Handler(error.to_string())
    }

    /// Status code a host should answer with
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } | Error::ClassNotFound(_) | Error::MethodNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::MiddlewareAbort { status, .. } => *status,
            Error::TokenMismatch => StatusCode::FORBIDDEN,
            Error::InvalidMethod(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = Error::NotFound {
            method: Method::Get,
            path: "/x".into(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(not_found.is_not_found());

        let not_allowed = Error::MethodNotAllowed {
            method: Method::Patch,
            path: "/photos".into(),
            allowed: vec![Method::Get, Method::Post],
        };
        assert_eq!(not_allowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(!not_allowed.is_not_found());

        let abort = Error::abort("banned", StatusCode::UNAUTHORIZED);
        assert_eq!(abort.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::TokenMismatch.status(), StatusCode::FORBIDDEN);
    }
}
