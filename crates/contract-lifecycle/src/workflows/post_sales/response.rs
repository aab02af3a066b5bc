use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::runner::RunResult;
use super::service::{TriggerError, TriggerOutcome};

/// Envelope returned by every trigger endpoint. `data` is only populated on success.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
            errors: Vec::new(),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            data: None,
            errors,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<TriggerOutcome> for ApiResponse<RunResult> {
    fn from(outcome: TriggerOutcome) -> Self {
        let message = outcome.message();
        ApiResponse::ok(outcome.result, message)
    }
}

/// Failure envelope for a trigger of `operation`. The error chain becomes `errors`.
pub fn trigger_failure(operation: &str, error: &TriggerError) -> ApiResponse<RunResult> {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let mut errors = vec![error.to_string()];
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        errors.push(inner.to_string());
        source = inner.source();
    }

    ApiResponse::failure(status, format!("Failed to {operation}"), errors)
}
