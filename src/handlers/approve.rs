use crate::error::{ApiError, ErrorResponse};
use crate::ledger::OrderId;
use crate::models::ApproveResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// POST /api/approve/{orderId} handler - Geocode a pending order and approve it
#[utoipa::path(
    post,
    path = routes::APPROVE,
    params(
        ("orderId" = String, Path, description = "Order identifier of the pending record")
    ),
    responses(
        (status = 200, description = "Order approved", body = ApproveResponse),
        (status = 400, description = "Invalid order id", body = ErrorResponse),
        (status = 404, description = "No pending record for this order", body = ErrorResponse),
        (status = 409, description = "Record changed during approval", body = ErrorResponse),
        (status = 500, description = "Geocoding failure or internal error", body = ErrorResponse)
    ),
    tag = "intake"
)]
pub async fn approve_handler(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<ApproveResponse>), ApiError> {
    let order_id = OrderId::parse(&order_id)?;

    let approval = state.ledger.approve(&order_id).await?;

    Ok((StatusCode::OK, Json(ApproveResponse::from(approval))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::Coordinates;
    use crate::handlers::test_support::{
        body_json, empty_request, json_request, sample_record, setup_test_app,
        setup_test_app_with, test_config, StubGeocoder,
    };
    use crate::store::KvStore;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_approve_success() {
        let (app, store) = setup_test_app();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/additem", &sample_record("A100")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("POST", "/api/approve/A100"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let response_json: ApproveResponse = body_json(response).await;
        assert_eq!(response_json.order_id, "A100");
        assert_eq!(response_json.key, "approved:A100");
        assert_eq!(response_json.coordinates, [-122.42, 37.77]);

        assert_eq!(store.get("pending:A100").await.unwrap(), None);
        let approved: serde_json::Value =
            serde_json::from_str(&store.get("approved:A100").await.unwrap().unwrap()).unwrap();
        assert_eq!(approved[0]["mapboxData"], serde_json::json!([-122.42, 37.77]));
        assert_eq!(approved[0]["clientInfo"]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_approve_not_found() {
        let (app, store) = setup_test_app();

        let response = app
            .oneshot(empty_request("POST", "/api/approve/A404"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error_response: ErrorResponse = body_json(response).await;
        assert_eq!(error_response.kind, "not_found");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_approve_upstream_failure() {
        let (app, store) = setup_test_app_with(test_config(), StubGeocoder(Err(503)));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/additem", &sample_record("A100")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("POST", "/api/approve/A100"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error_response: ErrorResponse = body_json(response).await;
        assert_eq!(error_response.kind, "upstream_failure");
        assert!(store.get("pending:A100").await.unwrap().is_some());
        assert_eq!(store.get("approved:A100").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_approve_record_without_address() {
        let (app, store) =
            setup_test_app_with(test_config(), StubGeocoder(Ok(Coordinates(0.0, 0.0))));
        store
            .put("pending:A100", r#"[{"orderId":"A100","intakeMethods":"dropoff"}]"#)
            .await
            .unwrap();

        let response = app
            .oneshot(empty_request("POST", "/api/approve/A100"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error_response: ErrorResponse = body_json(response).await;
        assert_eq!(error_response.kind, "internal_error");
        assert_eq!(error_response.error, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_approve_twice() {
        let (app, _) = setup_test_app();

        app.clone()
            .oneshot(json_request("POST", "/api/additem", &sample_record("A100")))
            .await
            .unwrap();
        let first = app
            .clone()
            .oneshot(empty_request("POST", "/api/approve/A100"))
            .await
            .unwrap();
        let second = app
            .oneshot(empty_request("POST", "/api/approve/A100"))
            .await
            .unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }
}
