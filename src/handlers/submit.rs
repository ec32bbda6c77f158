use crate::error::{ApiError, ErrorResponse};
use crate::models::SubmitResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value as JsonValue;

/// POST /api/additem handler - Submit an intake record as pending
///
/// The body is an array whose first element carries `orderId` and
/// `intakeMethods`. Resubmitting an order replaces its pending record.
#[utoipa::path(
    post,
    path = routes::SUBMIT,
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Record stored as pending", body = SubmitResponse),
        (status = 400, description = "Missing orderId or intakeMethods, or invalid JSON", body = ErrorResponse),
        (status = 409, description = "Order already approved", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "intake"
)]
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(record): Json<JsonValue>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let key = state.ledger.submit(&record).await?;

    Ok((StatusCode::OK, Json(SubmitResponse { key })))
}
