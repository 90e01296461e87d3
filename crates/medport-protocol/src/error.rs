//! Error taxonomy for backend calls.

use thiserror::Error;

/// Failure modes a caller can observe from one backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortalError {
    /// No response at all (DNS, connect, timeout). Retryable; never mutates
    /// session state.
    #[error("transport failure: {0}")]
    Transport(String),

    /// HTTP 401. Session teardown is handled by the interceptor before this
    /// surfaces to the caller.
    #[error("authorization failure")]
    Unauthorized,

    /// The transport succeeded but the body `statusCode` was not the success
    /// code. The backend message is passed through for display.
    #[error("backend rejected request [{status_code}]: {message}")]
    Api { status_code: i64, message: String },

    /// Response body did not match the expected shape. Classification treats
    /// this the same as a blocked record, never as active.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl PortalError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Whether a flow may simply retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
