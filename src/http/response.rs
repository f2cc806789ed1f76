//! Response envelope shared with peer services.
//!
//! Every body this service returns, and every body a peer returns to it, has
//! the shape `{status, code, message, data, errors}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self::with_status(StatusCode::OK, "Success".to_string(), Some(data), Vec::new())
    }

    pub fn failure(status: StatusCode, message: String, errors: Vec<Value>) -> Self {
        Self::with_status(status, message, None, errors)
    }

    fn with_status(status: StatusCode, message: String, data: Option<T>, errors: Vec<Value>) -> Self {
        Self {
            status: status.as_u16(),
            code: status_code_name(status),
            message,
            data,
            errors,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiEnvelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// `404` → `NOT_FOUND`
fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}
