//! Portalwarden error types.

use thiserror::Error;

/// How a single transport attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The attempt did not complete before its timeout.
    Timeout,
    /// DNS resolution or the TCP/TLS connection failed.
    Connect,
    /// Anything else that prevented a complete response.
    Other,
}

/// A transport-level failure: no HTTP response arrived at all.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    /// Failure class.
    pub kind: TransportErrorKind,
    /// Underlying error text.
    pub message: String,
}

impl TransportError {
    /// Build a transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeout shorthand.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Connection failure shorthand.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}

/// User-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Locally detectable bad input; never reached the network.
    Validation,
    /// The server answered with an error status or body.
    Rejected,
    /// No network path could reach the server.
    Unreachable,
    /// The server answered with something we could not use.
    Malformed,
}

/// Errors that can occur while driving the portal flow.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read.
    #[error("Configuration I/O error: {0}")]
    ConfigIO(String),

    /// Registration password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The API answered with a non-success status.
    #[error("{step} rejected (HTTP {status}): {detail}")]
    Rejected {
        /// Flow step that made the call.
        step: &'static str,
        /// HTTP status code.
        status: u16,
        /// Human-readable detail from the server, or a generic message.
        detail: String,
    },

    /// Every configured network path failed at the transport level.
    #[error("All {attempts} network paths unreachable, last error: {last_error}")]
    AllPathsUnreachable {
        /// Number of paths tried.
        attempts: usize,
        /// Transport error from the final path.
        last_error: TransportError,
    },

    /// A success response carried an unusable body.
    #[error("{step} returned an unusable response: {detail}")]
    Malformed {
        /// Flow step that made the call.
        step: &'static str,
        /// What was wrong.
        detail: String,
    },

    /// A success response carried no session token.
    #[error("{step} succeeded but returned no session token")]
    MissingToken {
        /// Flow step that made the call.
        step: &'static str,
    },

    /// Another submission is still in flight.
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    /// The requested action is not valid from the current state.
    #[error("Cannot {action} while in {state}")]
    InvalidTransition {
        /// Current state name.
        state: &'static str,
        /// Attempted action.
        action: &'static str,
    },
}

impl PortalError {
    /// Classify this error into a user-facing failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_)
            | Self::ConfigIO(_)
            | Self::PasswordMismatch
            | Self::SubmissionInFlight
            | Self::InvalidTransition { .. } => ErrorKind::Validation,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::AllPathsUnreachable { .. } => ErrorKind::Unreachable,
            Self::Malformed { .. } | Self::MissingToken { .. } => ErrorKind::Malformed,
        }
    }

    /// True only when no network path could reach the API.
    pub fn is_network_blocked(&self) -> bool {
        matches!(self, Self::AllPathsUnreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_not_network_blocked() {
        let err = PortalError::Rejected {
            step: "login",
            status: 401,
            detail: "Unable to log in".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(!err.is_network_blocked());
    }

    #[test]
    fn unreachable_is_network_blocked() {
        let err = PortalError::AllPathsUnreachable {
            attempts: 2,
            last_error: TransportError::timeout("deadline elapsed"),
        };
        assert_eq!(err.kind(), ErrorKind::Unreachable);
        assert!(err.is_network_blocked());
        assert!(err.to_string().contains("deadline elapsed"));
    }

    #[test]
    fn missing_token_is_malformed() {
        let err = PortalError::MissingToken { step: "register" };
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
