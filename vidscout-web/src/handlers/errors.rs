//! JSON error responses for the API

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use vidscout_core::{AttemptRecord, ResolutionFailure};

/// Error answer of an API handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    attempts: Vec<AttemptView>,
}

/// Attempt log entry as exposed to API clients
#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    /// Provider name
    pub provider: String,
    /// Candidate URL, if one could be built
    pub url: Option<String>,
    /// Human-readable failure reason
    pub reason: String,
}

impl From<&AttemptRecord> for AttemptView {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            provider: record.provider.clone(),
            url: record.url.as_ref().map(ToString::to_string),
            reason: record.failure.to_string(),
        }
    }
}

impl ApiError {
    /// Rejects malformed or inconsistent request parameters.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            attempts: Vec::new(),
        }
    }

    /// HTTP status of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ResolutionFailure> for ApiError {
    fn from(failure: ResolutionFailure) -> Self {
        let status = match &failure {
            ResolutionFailure::InvalidContentRef { .. } => StatusCode::BAD_REQUEST,
            ResolutionFailure::AllProvidersExhausted { .. } => StatusCode::NOT_FOUND,
            ResolutionFailure::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        Self {
            status,
            message: failure.to_string(),
            attempts: failure.attempts().iter().map(AttemptView::from).collect(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = if self.attempts.is_empty() {
            json!({ "error": self.message })
        } else {
            json!({ "error": self.message, "attempts": self.attempts })
        };

        (self.status, Json(body)).into_response()
    }
}
