use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{
    approve_handler, approved_handler, approved_pickup_handler, health_handler, order_handler,
    pending_handler, submit_handler, upload_handler,
};
use crate::policy::{cors_layer, enforce_allowed_hosts};
use crate::routes;
use crate::state::AppState;

/// Assemble every route with the request policy from `state.config`
pub fn build_router(state: AppState) -> Router {
    let policy = Arc::new(state.config.policy.clone());
    let upload_limit = state.config.upload.max_bytes;

    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .route(routes::SUBMIT, post(submit_handler))
        .route(routes::APPROVE, post(approve_handler))
        .route(routes::PENDING, get(pending_handler))
        .route(routes::APPROVED, get(approved_handler))
        .route(routes::APPROVED_PICKUP, get(approved_pickup_handler))
        .route(routes::ORDER, get(order_handler))
        .route(
            routes::UPLOAD,
            put(upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer(&policy))
        .layer(middleware::from_fn_with_state(policy, enforce_allowed_hosts))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
