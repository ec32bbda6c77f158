use crate::error::{ApiError, ErrorResponse};
use crate::ledger::Stage;
use crate::models::StageListResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// Drain the ledger's lazy stage listing into one response
async fn list_stage(
    state: &AppState,
    stage: Stage,
) -> Result<(StatusCode, Json<StageListResponse>), ApiError> {
    let entries = state.ledger.list_all(stage).await?;
    let response = StageListResponse::new(stage, entries);

    tracing::info!("Listed {} {:?} records", response.total_count, stage);

    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/pending handler - List records awaiting approval
#[utoipa::path(
    get,
    path = routes::PENDING,
    responses(
        (status = 200, description = "All pending records", body = StageListResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "intake"
)]
pub async fn pending_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StageListResponse>), ApiError> {
    list_stage(&state, Stage::Pending).await
}

/// GET /api/approved handler - List approved records not yet picked up
#[utoipa::path(
    get,
    path = routes::APPROVED,
    responses(
        (status = 200, description = "All approved records", body = StageListResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "intake"
)]
pub async fn approved_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StageListResponse>), ApiError> {
    list_stage(&state, Stage::Approved).await
}

/// GET /api/approvedpickup handler - List picked-up records
#[utoipa::path(
    get,
    path = routes::APPROVED_PICKUP,
    responses(
        (status = 200, description = "All picked-up records", body = StageListResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "intake"
)]
pub async fn approved_pickup_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StageListResponse>), ApiError> {
    list_stage(&state, Stage::PickedUp).await
}
