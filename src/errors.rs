use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::request_id::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error payload for HTTP responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Error taxonomy for the gateway integration.
///
/// Checkout submissions and webhook deliveries are trust boundaries: nothing
/// below them may escape unhandled, and only the user-facing variants carry
/// their message into the HTTP response. Remote-API detail stays in the logs.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input; surfaced verbatim, aborts before any remote call.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Remote create succeeded at transport level but violated the contract
    /// (e.g. no identifier in the response). Fatal for the submission.
    #[error("Remote contract violation: {0}")]
    RemoteContract(String),

    /// Remote call failed outright (transport, timeout, 5xx).
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// The remote invoice has no payable for the requested method.
    #[error("Payment payload missing: {0}")]
    PayloadMissing(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidInput(_)
            | Self::InvalidOperation(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            Self::RemoteContract(_) | Self::ExternalServiceError(_) | Self::PayloadMissing(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::SerializationError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message suitable for HTTP responses. Remote and internal errors are
    /// masked; diagnostic detail goes to the operator-facing log only.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::RemoteContract(_) | Self::ExternalServiceError(_) | Self::PayloadMissing(_) => {
                "Payment processor error".to_string()
            }
            Self::ServiceUnavailable(msg) => format!("Service unavailable: {}", msg),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
