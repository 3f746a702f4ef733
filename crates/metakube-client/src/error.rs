//! Error types for MetaKube API calls

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the API on non-2xx responses
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Structured error payload
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ErrorDetails {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<String>,
}

/// Failure of a single API call
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("{operation}: unexpected status {status}")]
    Status {
        /// API operation name, e.g. `getCluster`
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Parsed error body, when the server sent one
        body: Option<ErrorResponse>,
        /// Raw response body
        raw: String,
    },

    /// The request never produced a response
    #[error("{operation}: request failed: {source}")]
    Transport {
        /// API operation name
        operation: &'static str,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected shape
    #[error("{operation}: invalid response body: {source}")]
    Decode {
        /// API operation name
        operation: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be serialized
    #[error("{operation}: invalid request body: {source}")]
    Encode {
        /// API operation name
        operation: &'static str,
        /// Underlying encode error
        #[source]
        source: serde_json::Error,
    },

    /// The configured host is not a valid base URL
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Build a status error from a raw response body
    pub fn status(operation: &'static str, status: u16, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let body = serde_json::from_str::<ErrorResponse>(&raw).ok();
        Self::Status {
            operation,
            status,
            body,
            raw,
        }
    }

    /// HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// API operation name
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Status { operation, .. }
            | Self::Transport { operation, .. }
            | Self::Decode { operation, .. }
            | Self::Encode { operation, .. } => operation,
            Self::Url(_) => "buildUrl",
        }
    }

    /// True for 404 responses
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// True for connection failures and request timeouts
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_connect() || source.is_timeout())
    }
}
