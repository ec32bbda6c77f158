//! Key-value store collaborators backing the ledger.
//!
//! The ledger only needs a flat string-to-string namespace with prefix listing
//! and one atomic multi-key operation ([`KvStore::swap`]) for stage transitions.

pub mod memory;
pub mod spanner;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use spanner::SpannerClient;

/// One page of keys returned by [`KvStore::list_keys`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPage {
    pub keys: Vec<String>,
    /// Cursor for the following page, `None` once the prefix is exhausted
    pub next_cursor: Option<String>,
}

impl KeyPage {
    /// Build a page, emitting a continuation cursor only when the page is full.
    pub fn from_keys(keys: Vec<String>, limit: usize) -> Self {
        let next_cursor = if keys.len() >= limit {
            keys.last().cloned()
        } else {
            None
        };
        Self { keys, next_cursor }
    }
}

/// Result of a compare-and-swap move between two keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The source held the expected value; target written and source deleted
    Swapped,
    /// The source key did not exist
    Missing,
    /// The source key held a different value; nothing was written
    Changed,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite `key`.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// The ledger moves records with [`KvStore::swap`] and never calls this itself.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys starting with `prefix` in ascending order, strictly after `cursor`.
    async fn list_keys(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> Result<KeyPage>;

    /// Atomically move `from` to `to` if `from` still holds `expected`.
    ///
    /// On [`SwapOutcome::Swapped`] the store contains `to = value` and no `from`,
    /// with no intermediate state observable by other callers.
    async fn swap(&self, from: &str, expected: &str, to: &str, value: &str) -> Result<SwapOutcome>;

    async fn health_check(&self) -> Result<()>;
}
