use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ledger::{Approval, LedgerEntry, Stage};

/// Response type for successful submissions
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    pub key: String,
}

/// Response type for successful approvals
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveResponse {
    pub order_id: String,
    pub key: String,
    /// `[longitude, latitude]` attached to the record as `mapboxData`
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
}

impl From<Approval> for ApproveResponse {
    fn from(approval: Approval) -> Self {
        Self {
            order_id: approval.order_id.to_string(),
            key: approval.key,
            coordinates: [approval.coordinates.0, approval.coordinates.1],
        }
    }
}

/// One stored record in a stage listing
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct EntryResponse {
    pub key: String,
    /// `null` if the record vanished between listing and fetching
    pub value: Option<JsonValue>,
}

/// Response type for stage listings
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StageListResponse {
    pub stage: Stage,
    pub data: Vec<EntryResponse>,
    pub total_count: usize,
}

impl StageListResponse {
    pub fn new(stage: Stage, entries: Vec<LedgerEntry>) -> Self {
        let data: Vec<EntryResponse> = entries
            .into_iter()
            .map(|entry| EntryResponse {
                key: entry.key,
                value: entry.value,
            })
            .collect();
        Self {
            stage,
            total_count: data.len(),
            data,
        }
    }
}

/// Response type for single-order lookups
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub stage: Stage,
    pub key: String,
    pub value: Option<JsonValue>,
}

/// Query parameters for uploads
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Original file name, used only to derive the stored extension
    pub filename: Option<String>,
}

/// Response type for successful uploads
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}
