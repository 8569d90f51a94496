//! Error types for Quill.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`Fault`] - Failures raised by handlers, validators and the dispatcher
//!   while a call is in flight. Every variant maps onto one envelope status.
//! - [`DescribeError`] - A registration whose description cannot be turned
//!   into operation metadata.

use crate::envelope::status;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure raised while an operation is being dispatched.
///
/// Handlers return `Fault` for anything that is not a successful response.
/// The dispatcher converts it into a failure [`Envelope`] exactly once.
///
/// [`Envelope`]: crate::Envelope
#[derive(Error, Debug)]
pub enum Fault {
    /// The operation, or an entity it refers to, does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The input could not be decoded or failed validation.
    #[error("{message}")]
    BadInput {
        /// Summary of the problem.
        message: String,
        /// One entry per violated rule.
        violations: Vec<String>,
    },

    /// The caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A handler panicked during execution.
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// Anything unexpected.
    #[error("{0}")]
    Internal(#[source] BoxError),
}

impl Fault {
    /// Create a [`Fault::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Fault::NotFound(message.into())
    }

    /// Create a [`Fault::BadInput`] carrying every violation.
    pub fn bad_input(message: impl Into<String>, violations: Vec<String>) -> Self {
        Fault::BadInput {
            message: message.into(),
            violations,
        }
    }

    /// Create a [`Fault::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Fault::Unauthorized(message.into())
    }

    /// Create a [`Fault::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Fault::Forbidden(message.into())
    }

    /// Wrap any error (or message) as a [`Fault::Internal`].
    pub fn internal(source: impl Into<BoxError>) -> Self {
        Fault::Internal(source.into())
    }

    /// The envelope status code this fault maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Fault::NotFound(_) => status::NOT_FOUND,
            Fault::BadInput { .. } => status::BAD_REQUEST,
            Fault::Unauthorized(_) => status::UNAUTHORIZED,
            Fault::Forbidden(_) => status::FORBIDDEN,
            Fault::Cancelled | Fault::Panicked(_) | Fault::Internal(_) => status::INTERNAL_ERROR,
        }
    }

    /// The discrete error strings reported to the caller.
    ///
    /// Bad input reports its violations; every other fault reports its own
    /// message as a single entry.
    pub fn error_list(&self) -> Vec<String> {
        match self {
            Fault::BadInput { violations, .. } if !violations.is_empty() => violations.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<BoxError> for Fault {
    fn from(err: BoxError) -> Self {
        Fault::Internal(err)
    }
}

/// A registration that cannot be turned into operation metadata.
///
/// Discovery logs these and skips the offending operation; they never abort
/// discovery of the remaining operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescribeError {
    /// The operation declared an empty name.
    #[error("operation name must not be empty")]
    EmptyName,

    /// The operation declared an action that cannot be used as an identifier.
    #[error("operation '{name}' declares an invalid action '{action}'")]
    InvalidAction {
        /// Declared operation name.
        name: String,
        /// Offending action.
        action: String,
    },

    /// Stripping the kind suffix left nothing to derive an action from.
    #[error("operation '{name}' has no identifier left after removing its suffix")]
    EmptyAction {
        /// Declared operation name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_categories() {
        assert_eq!(Fault::not_found("missing").status_code(), 404);
        assert_eq!(Fault::bad_input("bad", vec![]).status_code(), 400);
        assert_eq!(Fault::unauthorized("who").status_code(), 401);
        assert_eq!(Fault::forbidden("no").status_code(), 403);
        assert_eq!(Fault::Cancelled.status_code(), 500);
        assert_eq!(Fault::internal("boom").status_code(), 500);
    }

    #[test]
    fn test_error_list_prefers_violations() {
        let fault = Fault::bad_input(
            "validation failed",
            vec!["Page must be greater than 0".into(), "Page size too big".into()],
        );
        assert_eq!(fault.error_list().len(), 2);

        let fault = Fault::bad_input("payload is not valid JSON", vec![]);
        assert_eq!(fault.error_list(), vec!["payload is not valid JSON".to_string()]);
    }

    #[test]
    fn test_internal_keeps_source_message() {
        let io = std::io::Error::other("disk full");
        let fault = Fault::internal(io);
        assert_eq!(fault.to_string(), "disk full");
    }
}
