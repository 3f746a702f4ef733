//! Error types and API error normalization
//!
//! API failures are turned into a single human-readable message and a retry
//! class here, so resources never inspect status codes themselves.

use std::time::Duration;

use metakube_client::ApiError;
use thiserror::Error;

use crate::validation::Diagnostics;

/// Main error type for provider operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The API rejected a call or could not be reached
    #[error("{context}: {message}")]
    Api {
        /// What the provider was doing, e.g. "create cluster"
        context: String,
        /// HTTP status code, if the server answered
        status: Option<u16>,
        /// Normalized error message
        message: String,
    },

    /// Plan-time validation failed
    #[error("{0}")]
    Validation(Diagnostics),

    /// A wait did not converge before its deadline
    #[error("timeout after {timeout:?} waiting for {description}{}", .last_state.as_deref().map(|s| format!(" (last state: {s})")).unwrap_or_default())]
    Timeout {
        /// What was awaited
        description: String,
        /// Configured deadline
        timeout: Duration,
        /// Last reason the poll reported for not being ready
        last_state: Option<String>,
    },

    /// The caller cancelled the operation
    #[error("cancelled while waiting for {description}")]
    Cancelled {
        /// What was awaited
        description: String,
    },

    /// A composite resource ID could not be parsed
    #[error("invalid id '{id}': {reason}")]
    InvalidId {
        /// The offending ID
        id: String,
        /// Why parsing failed
        reason: String,
    },

    /// A resource the operation depends on does not exist
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Resource kind
        kind: &'static str,
        /// Resource ID
        id: String,
    },

    /// Provider configuration is incomplete or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O failure (token file, log file)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an API error with the operation context and a normalized message
    pub fn api(context: impl Into<String>, err: &ApiError) -> Self {
        Self::Api {
            context: context.into(),
            status: err.status_code(),
            message: error_message(err),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-ID error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True when the error is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// What kind of call produced an API error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Plain read of a resource expected to exist
    Read,
    /// Create, update, patch or delete
    Mutate,
    /// Poll while waiting for a resource to converge after a write
    Wait,
    /// Poll while waiting for a resource to disappear
    WaitForDeletion,
}

/// How the caller should react to an API error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Try again within the current deadline
    Retryable,
    /// The resource does not exist (any more); not an error for the caller
    Gone,
    /// Surface to the user immediately
    Fatal,
}

/// Classify an API error for the given kind of call
pub fn classify(err: &ApiError, kind: CallKind) -> ErrorClass {
    let status = err.status_code();
    match (kind, status) {
        (CallKind::Mutate, Some(409)) => ErrorClass::Retryable,
        (CallKind::Read, Some(403 | 404)) => ErrorClass::Gone,
        (CallKind::WaitForDeletion, Some(403 | 404)) => ErrorClass::Gone,
        // RBAC and caches lag behind writes
        (CallKind::Wait, Some(403 | 404)) => ErrorClass::Retryable,
        (CallKind::Wait | CallKind::WaitForDeletion, Some(502..=504)) => ErrorClass::Retryable,
        (CallKind::Wait | CallKind::WaitForDeletion, None) if err.is_transport() => {
            ErrorClass::Retryable
        }
        _ => ErrorClass::Fatal,
    }
}

/// Human-readable message for an API error
///
/// Prefers the structured error body (message plus additional details), then
/// a JSON rendering of the whole failure, then the error's own `Display`.
pub fn error_message(err: &ApiError) -> String {
    match err {
        ApiError::Status {
            body: Some(body), ..
        } if !body.error.message.is_empty() => {
            if body.error.additional.is_empty() {
                body.error.message.clone()
            } else {
                format!(
                    "{} [{}]",
                    body.error.message,
                    body.error.additional.join(", ")
                )
            }
        }
        ApiError::Status {
            operation,
            status,
            raw,
            ..
        } if !raw.trim().is_empty() => {
            let body = serde_json::from_str::<serde_json::Value>(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.trim().to_string()));
            serde_json::json!({
                "operation": operation,
                "status": status,
                "body": body,
            })
            .to_string()
        }
        other => other.to_string(),
    }
}
