//! Backend response envelope.
//!
//! Every endpoint answers `{ statusCode, message?, data }`. A `statusCode`
//! other than [`SUCCESS_CODE`] is an application-level rejection even when
//! the HTTP transport reported 200.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

/// Body `statusCode` the backend uses for success.
pub const SUCCESS_CODE: i64 = 200;

/// Typed response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub status_code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_CODE
    }

    /// Unwrap the payload, turning a non-success `statusCode` into an
    /// [`PortalError::Api`] and a success envelope without `data` into a
    /// malformed-payload error.
    pub fn into_result(self) -> Result<T, PortalError> {
        if !self.is_success() {
            return Err(PortalError::Api {
                status_code: self.status_code,
                message: self
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        self.data
            .ok_or_else(|| PortalError::malformed("success envelope without data"))
    }
}

/// Decode a raw JSON body into the envelope's payload type.
pub fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, PortalError> {
    let envelope: ApiEnvelope<T> = serde_json::from_value(body)
        .map_err(|e| PortalError::malformed(format!("invalid envelope: {e}")))?;
    envelope.into_result()
}
