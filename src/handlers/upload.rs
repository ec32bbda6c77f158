use crate::error::{ApiError, ErrorResponse};
use crate::models::{UploadQuery, UploadResponse};
use crate::objects::generate_object_key;
use crate::routes;
use crate::state::AppState;
use axum::{body::Bytes, extract::Query, extract::State, http::StatusCode, Json};

/// PUT /api/upload handler - Store a file and return its public location
///
/// The raw request body is the file content. Each upload gets a fresh key.
#[utoipa::path(
    put,
    path = routes::UPLOAD,
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Empty body", body = ErrorResponse),
        (status = 413, description = "Body exceeds the upload limit"),
        (status = 500, description = "Object store error", body = ErrorResponse)
    ),
    tag = "uploads"
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::EmptyUpload);
    }

    let key = generate_object_key(query.filename.as_deref());
    let url = state
        .objects
        .put(&key, &body)
        .await
        .map_err(ApiError::UploadFailed)?;

    tracing::info!("Stored upload {} ({} bytes)", key, body.len());
    Ok((StatusCode::OK, Json(UploadResponse { key, url })))
}
