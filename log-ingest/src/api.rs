use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Ingested,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestResponse {
    pub status: IngestStatus,
    pub tenant_id: String,
    /// Server receipt time, unix seconds.
    pub timestamp: i64,
}

impl IngestResponse {
    pub fn new(tenant_id: String, received_at: DateTime<Utc>) -> Self {
        Self {
            status: IngestStatus::Ingested,
            tenant_id,
            timestamp: received_at.timestamp(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: HealthState,
    pub service: String,
    pub version: String,
}

/// Errors terminating an ingest request.
///
/// `Display` is the diagnostic representation and may carry backend detail;
/// it is only ever logged. Clients receive [`IngestError::client_message`].
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("failed to parse request: {0}")]
    RequestParsingError(#[from] serde_json::Error),

    #[error("unknown log level: {0:?}")]
    InvalidLevel(String),
    #[error("message is {length} characters, limit is {max}")]
    MessageTooLong { length: usize, max: usize },

    #[error("failed to store event: {0}")]
    StorageError(#[from] StorageError),
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IngestError::RequestParsingError(_)
            | IngestError::InvalidLevel(_)
            | IngestError::MessageTooLong { .. } => StatusCode::BAD_REQUEST,
            IngestError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn client_message(&self) -> String {
        match self {
            IngestError::MethodNotAllowed => "POST only".to_owned(),
            // Decoder diagnostics only describe the caller's own payload.
            IngestError::RequestParsingError(err) => format!("Invalid JSON: {}", err),
            IngestError::InvalidLevel(_) | IngestError::MessageTooLong { .. } => {
                format!("Invalid event: {}", self)
            }
            IngestError::StorageError(_) => "Database error".to_owned(),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (self.status(), self.client_message()).into_response()
    }
}
