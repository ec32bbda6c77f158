use crate::error::{ApiError, ErrorResponse};
use crate::ledger::OrderId;
use crate::models::OrderResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// GET /api/list/{orderId} handler - Current record of one order
///
/// Reports the order at its most advanced stage.
#[utoipa::path(
    get,
    path = routes::ORDER,
    params(
        ("orderId" = String, Path, description = "Order identifier")
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 400, description = "Invalid order id", body = ErrorResponse),
        (status = 404, description = "Order not found in any stage", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "intake"
)]
pub async fn order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order_id = OrderId::parse(&order_id)?;

    match state.ledger.find(&order_id).await? {
        Some(entry) => {
            tracing::info!("Found order {} in stage {:?}", order_id, entry.stage);
            Ok((
                StatusCode::OK,
                Json(OrderResponse {
                    order_id: order_id.to_string(),
                    stage: entry.stage,
                    key: entry.key,
                    value: entry.value,
                }),
            ))
        }
        None => {
            tracing::info!("Order not found: {}", order_id);
            Err(ApiError::OrderNotFound(order_id.to_string()))
        }
    }
}
