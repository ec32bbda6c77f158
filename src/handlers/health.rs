use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /health handler - Store reachability probe
///
/// 503 when the key-value store cannot answer a trivial read.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<UnhealthyResponse>)> {
    let store = state.config.store.name().to_string();

    if let Err(err) = state.ledger.health_check().await {
        tracing::error!("Health check against {} store failed: {:#}", store, err);
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(UnhealthyResponse {
                status: "unhealthy".to_string(),
                error: format!("{:#}", err),
                store,
            }),
        ));
    }

    tracing::debug!("Health check passed");
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        store,
    }))
}
