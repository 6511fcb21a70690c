// Error types for the deal evaluation system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the deal evaluation system
///
/// Covers definition validation, store access and usage recording. Note that
/// "not eligible" is never an error: eligibility checks return a plain `false`
/// and checkout evaluation returns an empty selection.
#[derive(Debug, Error)]
pub enum DealError {
    /// A deal definition failed structural validation
    /// (benefit shape mismatch, out-of-range values, inverted date range)
    #[error("Invalid deal definition: {0}")]
    InvalidDefinition(String),

    /// Deal not found in the store
    #[error("Deal not found: {0}")]
    NotFound(Uuid),

    /// The deal lost the atomic usage-cap guard during checkout.
    /// Surfaced to customers as "deal no longer available", not as a fault.
    #[error("Deal {0} is no longer available")]
    NoLongerAvailable(Uuid),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// JSON errors when parsing benefit payloads from JSONB
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for deal operations
pub type DealResult<T> = Result<T, DealError>;

impl From<validator::ValidationErrors> for DealError {
    fn from(err: validator::ValidationErrors) -> Self {
        DealError::InvalidDefinition(err.to_string())
    }
}

impl IntoResponse for DealError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            DealError::InvalidDefinition(_) => (StatusCode::BAD_REQUEST, "Invalid deal definition"),
            DealError::NotFound(_) => (StatusCode::NOT_FOUND, "Deal not found"),
            DealError::NoLongerAvailable(_) => (StatusCode::CONFLICT, "Deal no longer available"),
            DealError::DatabaseError(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            DealError::JsonError(_) => (StatusCode::BAD_REQUEST, "JSON parsing error"),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}
