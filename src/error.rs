//! Service-level error taxonomy.
//!
//! Low-level call failures never reach handlers directly: they are resolved by a
//! fallback supplier into a value or into one of these errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::data::StoreError;
use crate::http::response::ApiEnvelope;

/// Errors surfaced to request handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A mutating call could not reach its peer; never reported as success.
    #[error("{peer} is temporarily unavailable ({operation})")]
    UpstreamUnavailable { peer: String, operation: String },

    /// The peer answered with a 4xx to a mutating call.
    #[error("{peer} rejected {operation} with status {status}")]
    PeerRejected {
        peer: String,
        operation: String,
        status: u16,
        errors: Vec<serde_json::Value>,
    },

    #[error("access denied")]
    AuthorizationDenied,

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("resource not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::PeerRejected { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::AuthorizationDenied => StatusCode::FORBIDDEN,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, errors) = match self {
            ServiceError::UpstreamUnavailable { .. } => {
                ("Service temporarily unavailable".to_string(), Vec::new())
            }
            ServiceError::PeerRejected { errors, .. } => {
                ("Upstream rejected the request".to_string(), errors)
            }
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "Record store failure");
                ("Internal error".to_string(), Vec::new())
            }
            // no resource detail for denials
            ServiceError::AuthorizationDenied => ("Access denied".to_string(), Vec::new()),
            other => (other.to_string(), Vec::new()),
        };
        ApiEnvelope::<()>::failure(status, message, errors).into_response()
    }
}
