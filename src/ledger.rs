//! Intake ledger: workflow stage encoded in the key prefix of a flat KV namespace.
//!
//! Every order has one addressable slot per stage, built by [`stage_key`]:
//!
//! ```text
//! pending:<orderId>          submitted, awaiting approval
//! approved:<orderId>         geocoded and approved
//! approved:pickup:<orderId>  picked up (written by an external process, read only here)
//! ```
//!
//! The intake method is part of the stored record, not of the key, so submit and
//! approve always agree on where a pending order lives.
//!
//! The pending → approved transition is a single [`KvStore::swap`], conditional on
//! the pending record still holding exactly what was geocoded. There is no window
//! in which both keys exist, and concurrent approvals of one order produce exactly
//! one approved write.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

use crate::geocode::{Coordinates, GeocodeError, Geocoder};
use crate::store::{KvStore, SwapOutcome};

/// Lifecycle stage of an order, encoded as a key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Approved,
    PickedUp,
}

impl Stage {
    pub fn prefix(self) -> &'static str {
        match self {
            Stage::Pending => "pending:",
            Stage::Approved => "approved:",
            Stage::PickedUp => "approved:pickup:",
        }
    }

    /// Classify a raw key. `approved:pickup:` is tested before `approved:`.
    pub fn of_key(key: &str) -> Option<Stage> {
        [Stage::PickedUp, Stage::Approved, Stage::Pending]
            .into_iter()
            .find(|stage| key.starts_with(stage.prefix()))
    }
}

/// Validated order identifier, safe to embed as a single key segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidOrderId(
                "order id must not be empty".to_string(),
            ));
        }
        if trimmed.contains(':') {
            return Err(LedgerError::InvalidOrderId(format!(
                "order id must not contain ':', got '{}'",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The one place ledger keys are built
pub fn stage_key(stage: Stage, order_id: &OrderId) -> String {
    format!("{}{}", stage.prefix(), order_id)
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid order id: {0}")]
    InvalidOrderId(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("no pending record for order {0}")]
    NotFound(OrderId),

    #[error("order {0} has already been approved")]
    AlreadyApproved(OrderId),

    #[error("pending record for order {0} changed while it was being approved")]
    Conflict(OrderId),

    #[error("geocoding failed: {0}")]
    Upstream(#[from] GeocodeError),

    #[error("malformed stored record at {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// A stored record together with its key
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub key: String,
    pub stage: Stage,
    /// `None` when the key disappeared between listing and fetching
    pub value: Option<JsonValue>,
}

/// Successful pending → approved transition
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub order_id: OrderId,
    pub key: String,
    pub coordinates: Coordinates,
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn KvStore>,
    geocoder: Arc<dyn Geocoder>,
    page_size: usize,
}

impl Ledger {
    pub fn new(store: Arc<dyn KvStore>, geocoder: Arc<dyn Geocoder>, page_size: usize) -> Self {
        Self {
            store,
            geocoder,
            page_size: page_size.max(1),
        }
    }

    /// Store `record` as the pending record of its order, replacing any earlier submission.
    ///
    /// `record[0]` must carry `orderId` and `intakeMethods`. Returns the key written.
    pub async fn submit(&self, record: &JsonValue) -> Result<String, LedgerError> {
        let first = record
            .as_array()
            .and_then(|items| items.first())
            .and_then(JsonValue::as_object)
            .ok_or_else(|| {
                LedgerError::InvalidRecord(
                    "expected a non-empty array whose first element is an object".to_string(),
                )
            })?;

        let order_id = match first.get("orderId") {
            Some(JsonValue::String(id)) => OrderId::parse(id)?,
            Some(JsonValue::Number(id)) => OrderId::parse(&id.to_string())?,
            _ => {
                return Err(LedgerError::InvalidRecord(
                    "record[0].orderId must be a string or number".to_string(),
                ))
            }
        };
        if first.get("intakeMethods").is_none_or(JsonValue::is_null) {
            return Err(LedgerError::InvalidRecord(
                "record[0].intakeMethods is required".to_string(),
            ));
        }

        // Best effort: a concurrent approve can still land between this check and the put
        for stage in [Stage::Approved, Stage::PickedUp] {
            if self.store.get(&stage_key(stage, &order_id)).await?.is_some() {
                return Err(LedgerError::AlreadyApproved(order_id));
            }
        }

        let key = stage_key(Stage::Pending, &order_id);
        let serialized = serde_json::to_string(record)
            .map_err(|e| LedgerError::InvalidRecord(e.to_string()))?;
        self.store.put(&key, &serialized).await?;

        tracing::info!("Submitted order {} as {}", order_id, key);
        Ok(key)
    }

    /// Lazily enumerate every record in `stage`, following store cursors page by page.
    ///
    /// Values within a page are fetched concurrently. There is no snapshot
    /// consistency across pages or between listing a key and fetching it; a key
    /// gone by fetch time is reported with `value: None`. Stored content never
    /// fails a listing.
    pub fn list_stage(&self, stage: Stage) -> BoxStream<'static, Result<LedgerEntry, LedgerError>> {
        let store = self.store.clone();
        let page_size = self.page_size;

        // State: Some(cursor) while pages remain, None once exhausted
        let pages = stream::try_unfold(Some(None::<String>), move |state| {
            let store = store.clone();
            async move {
                let Some(cursor) = state else {
                    return Ok::<_, LedgerError>(None);
                };

                let page = store
                    .list_keys(stage.prefix(), cursor.as_deref(), page_size)
                    .await?;
                let keys: Vec<String> = page
                    .keys
                    .into_iter()
                    .filter(|key| Stage::of_key(key) == Some(stage))
                    .collect();

                let values =
                    futures::future::try_join_all(keys.iter().map(|key| store.get(key))).await?;

                let entries: Vec<LedgerEntry> = keys
                    .into_iter()
                    .zip(values)
                    .map(|(key, raw)| {
                        let value = raw.map(|raw| read_stored(&key, raw));
                        LedgerEntry { key, stage, value }
                    })
                    .collect();

                Ok(Some((entries, page.next_cursor.map(Some))))
            }
        });

        pages
            .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, LedgerError>)))
            .try_flatten()
            .boxed()
    }

    /// Collect [`Ledger::list_stage`] into memory.
    pub async fn list_all(&self, stage: Stage) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.list_stage(stage).try_collect().await
    }

    /// Geocode the pending record of `order_id` and move it to the approved stage.
    pub async fn approve(&self, order_id: &OrderId) -> Result<Approval, LedgerError> {
        let pending_key = stage_key(Stage::Pending, order_id);
        let approved_key = stage_key(Stage::Approved, order_id);

        let Some(original) = self.store.get(&pending_key).await? else {
            return Err(LedgerError::NotFound(order_id.clone()));
        };

        let mut record = parse_record(&pending_key, &original)?;
        let address = record
            .get(0)
            .and_then(|first| first.pointer("/clientInfo/address"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| LedgerError::MalformedRecord {
                key: pending_key.clone(),
                reason: "missing string field record[0].clientInfo.address".to_string(),
            })?;

        let coordinates = self.geocoder.geocode(&address).await?;

        let first = record
            .get_mut(0)
            .and_then(JsonValue::as_object_mut)
            .ok_or_else(|| LedgerError::MalformedRecord {
                key: pending_key.clone(),
                reason: "record[0] is not an object".to_string(),
            })?;
        first.insert(
            "mapboxData".to_string(),
            serde_json::json!([coordinates.0, coordinates.1]),
        );
        let updated = serde_json::to_string(&record).map_err(|e| LedgerError::MalformedRecord {
            key: pending_key.clone(),
            reason: e.to_string(),
        })?;

        match self
            .store
            .swap(&pending_key, &original, &approved_key, &updated)
            .await?
        {
            SwapOutcome::Swapped => {
                tracing::info!("Approved order {} at {:?}", order_id, coordinates);
                Ok(Approval {
                    order_id: order_id.clone(),
                    key: approved_key,
                    coordinates,
                })
            }
            SwapOutcome::Missing => {
                tracing::info!("Order {} left pending before approval committed", order_id);
                Err(LedgerError::NotFound(order_id.clone()))
            }
            SwapOutcome::Changed => {
                tracing::warn!("Order {} was resubmitted during approval", order_id);
                Err(LedgerError::Conflict(order_id.clone()))
            }
        }
    }

    /// Current record of `order_id` at its most advanced stage.
    pub async fn find(&self, order_id: &OrderId) -> Result<Option<LedgerEntry>, LedgerError> {
        for stage in [Stage::PickedUp, Stage::Approved, Stage::Pending] {
            let key = stage_key(stage, order_id);
            if let Some(raw) = self.store.get(&key).await? {
                let value = read_stored(&key, raw);
                return Ok(Some(LedgerEntry {
                    key,
                    stage,
                    value: Some(value),
                }));
            }
        }
        Ok(None)
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        self.store.health_check().await
    }
}

/// Stored value for display. Text that is not JSON (e.g. rows written by the
/// pickup process) is returned verbatim as a JSON string.
fn read_stored(key: &str, raw: String) -> JsonValue {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("Stored value at {} is not JSON ({}), returning raw text", key, err);
            JsonValue::String(raw)
        }
    }
}

fn parse_record(key: &str, raw: &str) -> Result<JsonValue, LedgerError> {
    serde_json::from_str(raw).map_err(|e| LedgerError::MalformedRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
