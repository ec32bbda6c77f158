use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::ledger::Stage;
use crate::models::{
    ApproveResponse, EntryResponse, OrderResponse, StageListResponse, SubmitResponse,
    UploadResponse,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "intake-ledger API",
        version = "1.0.0",
        description = "Intake and approval workflow over a key-value store, with geocoding enrichment"
    ),
    paths(
        handlers::health::health_handler,
        handlers::submit::submit_handler,
        handlers::approve::approve_handler,
        handlers::list::pending_handler,
        handlers::list::approved_handler,
        handlers::list::approved_pickup_handler,
        handlers::order::order_handler,
        handlers::upload::upload_handler
    ),
    components(
        schemas(
            Stage,
            SubmitResponse,
            ApproveResponse,
            EntryResponse,
            StageListResponse,
            OrderResponse,
            UploadResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "intake", description = "Intake submission, approval and listing"),
        (name = "uploads", description = "File uploads to object storage")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            crate::routes::HEALTH,
            crate::routes::SUBMIT,
            crate::routes::APPROVE,
            crate::routes::PENDING,
            crate::routes::APPROVED,
            crate::routes::APPROVED_PICKUP,
            crate::routes::ORDER,
            crate::routes::UPLOAD,
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
