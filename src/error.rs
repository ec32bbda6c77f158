use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error kind, e.g. `not_found` or `upstream_failure`
    pub kind: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Store backend in use, `spanner` or `memory`
    pub store: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub store: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Maps ledger and upload failures to HTTP status codes and a JSON body.
/// Internal failures are logged with their cause and reported generically.
#[derive(Debug)]
pub enum ApiError {
    /// Failure inside the intake ledger
    Ledger(LedgerError),
    /// No record for the order in any stage
    OrderNotFound(String),
    /// Upload could not be stored
    UploadFailed(anyhow::Error),
    /// Upload body was empty
    EmptyUpload,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::InvalidOrderId(_) => "invalid_order_id",
                LedgerError::InvalidRecord(_) => "invalid_record",
                LedgerError::NotFound(_) => "not_found",
                LedgerError::AlreadyApproved(_) => "already_approved",
                LedgerError::Conflict(_) => "conflict",
                LedgerError::Upstream(_) => "upstream_failure",
                LedgerError::MalformedRecord { .. } | LedgerError::Store(_) => "internal_error",
            },
            ApiError::OrderNotFound(_) => "not_found",
            ApiError::UploadFailed(_) => "internal_error",
            ApiError::EmptyUpload => "invalid_upload",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind().to_string();
        let (status, error_message) = match self {
            ApiError::Ledger(err) => match err {
                LedgerError::InvalidOrderId(_) | LedgerError::InvalidRecord(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "Item not found".to_string()),
                LedgerError::AlreadyApproved(_) | LedgerError::Conflict(_) => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                LedgerError::Upstream(_) => {
                    tracing::error!("Upstream failure: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Geocoding service failed".to_string())
                }
                LedgerError::MalformedRecord { .. } | LedgerError::Store(_) => {
                    tracing::error!("Internal error: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
            ApiError::OrderNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("No record for order: {}", id),
            ),
            ApiError::UploadFailed(err) => {
                tracing::error!("Upload failed: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            ApiError::EmptyUpload => (
                StatusCode::BAD_REQUEST,
                "Upload body must not be empty".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            kind,
        });

        (status, body).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}
