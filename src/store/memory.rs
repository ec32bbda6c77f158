use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{KeyPage, KvStore, SwapOutcome};

/// Process-local store, used for development and tests
///
/// Keys are kept sorted so listing and cursors behave like the Spanner backend.
/// `swap` runs under a single write lock, which makes it atomic with respect to
/// every other operation on the same store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        tracing::debug!("Stored key: {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        tracing::debug!("Deleted key: {}", key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> Result<KeyPage> {
        let limit = limit.max(1);
        let start = match cursor {
            Some(cursor) => Bound::Excluded(cursor),
            None => Bound::Included(prefix),
        };

        let entries = self.entries.read().await;
        let keys: Vec<String> = entries
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect();

        Ok(KeyPage::from_keys(keys, limit))
    }

    async fn swap(&self, from: &str, expected: &str, to: &str, value: &str) -> Result<SwapOutcome> {
        let mut entries = self.entries.write().await;

        let outcome = match entries.get(from).map(|current| current == expected) {
            None => SwapOutcome::Missing,
            Some(false) => SwapOutcome::Changed,
            Some(true) => {
                entries.insert(to.to_string(), value.to_string());
                entries.remove(from);
                SwapOutcome::Swapped
            }
        };

        tracing::debug!("Swap {} -> {}: {:?}", from, to, outcome);
        Ok(outcome)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();

        assert_eq!(store.get("pending:1").await.unwrap(), None);

        store.put("pending:1", "[1]").await.unwrap();
        assert_eq!(store.get("pending:1").await.unwrap().as_deref(), Some("[1]"));

        store.put("pending:1", "[2]").await.unwrap();
        assert_eq!(store.get("pending:1").await.unwrap().as_deref(), Some("[2]"));
        assert_eq!(store.len().await, 1);

        store.delete("pending:1").await.unwrap();
        assert_eq!(store.get("pending:1").await.unwrap(), None);

        // Deleting again is a no-op
        store.delete("pending:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys_respects_prefix() {
        let store = MemoryStore::new();
        for key in ["approved:1", "approved:pickup:2", "pending:3", "pending:4", "zzz"] {
            store.put(key, "[]").await.unwrap();
        }

        let page = store.list_keys("pending:", None, 10).await.unwrap();
        assert_eq!(page.keys, vec!["pending:3", "pending:4"]);
        assert_eq!(page.next_cursor, None);

        let page = store.list_keys("approved:", None, 10).await.unwrap();
        assert_eq!(page.keys, vec!["approved:1", "approved:pickup:2"]);

        let page = store.list_keys("missing:", None, 10).await.unwrap();
        assert!(page.keys.is_empty());
    }

    #[tokio::test]
    async fn test_list_keys_follows_cursor() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.put(&format!("pending:{}", i), "[]").await.unwrap();
        }
        store.put("pendinh", "[]").await.unwrap();

        let first = store.list_keys("pending:", None, 2).await.unwrap();
        assert_eq!(first.keys, vec!["pending:0", "pending:1"]);
        assert_eq!(first.next_cursor.as_deref(), Some("pending:1"));

        let second = store
            .list_keys("pending:", first.next_cursor.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["pending:2", "pending:3"]);

        let third = store
            .list_keys("pending:", second.next_cursor.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(third.keys, vec!["pending:4"]);
        assert_eq!(third.next_cursor, None);
    }

    #[tokio::test]
    async fn test_swap_outcomes() {
        let store = MemoryStore::new();

        let outcome = store.swap("pending:1", "[]", "approved:1", "[1]").await.unwrap();
        assert_eq!(outcome, SwapOutcome::Missing);
        assert_eq!(store.get("approved:1").await.unwrap(), None);

        store.put("pending:1", "[0]").await.unwrap();
        let outcome = store.swap("pending:1", "[]", "approved:1", "[1]").await.unwrap();
        assert_eq!(outcome, SwapOutcome::Changed);
        assert_eq!(store.get("pending:1").await.unwrap().as_deref(), Some("[0]"));
        assert_eq!(store.get("approved:1").await.unwrap(), None);

        let outcome = store.swap("pending:1", "[0]", "approved:1", "[1]").await.unwrap();
        assert_eq!(outcome, SwapOutcome::Swapped);
        assert_eq!(store.get("pending:1").await.unwrap(), None);
        assert_eq!(store.get("approved:1").await.unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<MemoryStore>();
    }
}
