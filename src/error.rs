use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic handling of session failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Transport never produced a usable response
    NetworkFailure,

    // The server answered with a failure payload
    ServerRejected,

    // Authentication errors
    MissingToken,

    // Payload/validation errors
    InvalidPayload,
    ValidationFailed,

    // Durable storage errors
    StorageFailure,
}

/// Error type covering the remote auth client, the session store, and the
/// durable session storage. One failed attempt is always terminal; nothing
/// in this crate retries automatically.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Transport-level failure: the request never produced a server response.
    #[error("network error: {0}")]
    Network(anyhow::Error),

    /// The server responded with a non-success status. The message is taken
    /// from the response body's `error` field when present, otherwise a
    /// per-operation fallback.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A profile fetch was attempted with no credential token in storage.
    #[error("no credential token is stored")]
    MissingToken,

    /// A success response carried a body that did not match the wire contract.
    #[error("invalid response payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// Input rejected client-side; no request was issued.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The durable session storage failed to read or write.
    #[error("session storage error: {0}")]
    Storage(anyhow::Error),
}

impl AuthError {
    /// Wrap a transport failure
    pub fn network(source: impl Into<anyhow::Error>) -> Self {
        Self::Network(source.into())
    }

    /// Wrap a storage failure
    pub fn storage(source: impl Into<anyhow::Error>) -> Self {
        Self::Storage(source.into())
    }

    /// Build a validation error for a named form field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network(_) => ErrorCode::NetworkFailure,
            Self::Server { .. } => ErrorCode::ServerRejected,
            Self::MissingToken => ErrorCode::MissingToken,
            Self::InvalidPayload(_) => ErrorCode::InvalidPayload,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}
