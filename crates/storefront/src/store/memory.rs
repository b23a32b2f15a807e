//! In-process document store.
//!
//! Backs local development and the test suites. Supports fault injection so
//! callers can exercise unavailable-store and partial-failure paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{RwLock, broadcast};

use super::{
    CHANGE_CHANNEL_CAPACITY, Change, ChangeKind, Document, DocumentStore, Fields, Query,
    StoreError, Subscription, WriteMode,
};

/// Document store kept in memory.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
    changes: broadcast::Sender<Arc<Change>>,
    last_timestamp: Mutex<DateTime<Utc>>,
    offline: AtomicBool,
    failing_deletes: AtomicU32,
    failing_puts: RwLock<HashSet<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            collections: RwLock::default(),
            changes,
            last_timestamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
            offline: AtomicBool::new(false),
            failing_deletes: AtomicU32::new(0),
            failing_puts: RwLock::default(),
        }
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` deletes.
    pub fn fail_next_deletes(&self, count: u32) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    /// Fail every put to `collection` until [`MemoryStore::restore`].
    pub async fn fail_puts_to(&self, collection: &str) {
        self.failing_puts.write().await.insert(collection.to_string());
    }

    /// Clear all injected faults.
    pub async fn restore(&self) {
        self.set_offline(false);
        self.fail_next_deletes(0);
        self.failing_puts.write().await.clear();
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Number of documents in `collection`.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn take_delete_fault(&self) -> bool {
        self.failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn notify(&self, change: Change) {
        // No receivers is fine.
        let _ = self.changes.send(Arc::new(change));
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        if self.failing_puts.read().await.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "writes to {collection} are failing"
            )));
        }

        let stored = {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            match (mode, docs.get_mut(id)) {
                (WriteMode::Merge, Some(existing)) => {
                    existing.extend(fields);
                    existing.clone()
                }
                _ => {
                    docs.insert(id.to_string(), fields.clone());
                    fields
                }
            }
        };

        self.notify(Change {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Upserted,
            fields: Some(stored),
        });
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        if self.take_delete_fault() {
            return Err(StoreError::Unavailable(format!(
                "delete of {collection}/{id} failed"
            )));
        }

        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();

        if removed {
            self.notify(Change {
                collection: collection.to_string(),
                id: id.to_string(),
                kind: ChangeKind::Deleted,
                fields: None,
            });
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let mut documents: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .into_iter()
                .flatten()
                .filter(|(_, fields)| query.matches(fields))
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect()
        };
        query.sort(&mut documents);
        Ok(documents)
    }

    fn subscribe(&self, collection: &str, query: Query) -> Subscription {
        Subscription::new(collection, query, self.changes.subscribe())
    }

    async fn server_timestamp(&self) -> Result<DateTime<Utc>, StoreError> {
        self.check_online()?;
        // Strictly increasing so documents written back to back still sort.
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let next = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = next;
        Ok(next)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::store::Direction;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        store
            .put("orders", "o1", fields(json!({"status": "pending"})), WriteMode::Replace)
            .await
            .unwrap();
        let doc = store.get("orders", "o1").await.unwrap().unwrap();
        assert_eq!(doc.fields["status"], "pending");

        store.delete("orders", "o1").await.unwrap();
        assert!(store.get("orders", "o1").await.unwrap().is_none());
        // Idempotent
        store.delete("orders", "o1").await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_keeps_other_fields() {
        let store = MemoryStore::new();
        store
            .put("orders", "o1", fields(json!({"status": "pending", "total": "5"})), WriteMode::Replace)
            .await
            .unwrap();
        store
            .put("orders", "o1", fields(json!({"status": "completed"})), WriteMode::Merge)
            .await
            .unwrap();
        let doc = store.get("orders", "o1").await.unwrap().unwrap();
        assert_eq!(doc.fields["status"], "completed");
        assert_eq!(doc.fields["total"], "5");

        store
            .put("orders", "o1", fields(json!({"status": "pending"})), WriteMode::Replace)
            .await
            .unwrap();
        let doc = store.get("orders", "o1").await.unwrap().unwrap();
        assert!(!doc.fields.contains_key("total"));
    }

    #[tokio::test]
    async fn test_query_filters_and_sorts() {
        let store = MemoryStore::new();
        for (id, user, at) in [
            ("a", "u1", "2026-01-01T00:00:00Z"),
            ("b", "u2", "2026-01-02T00:00:00Z"),
            ("c", "u1", "2026-01-03T00:00:00Z"),
        ] {
            store
                .put("orders", id, fields(json!({"userId": user, "createdAt": at})), WriteMode::Replace)
                .await
                .unwrap();
        }
        let docs = store
            .query(
                "orders",
                &Query::all()
                    .where_eq("userId", "u1")
                    .order_by("createdAt", Direction::Descending),
            )
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
        assert!(store.query("nothing", &Query::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_sees_only_its_collection_and_releases_on_drop() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("users/u1/cart", Query::all());
        assert_eq!(store.subscriber_count(), 1);

        store
            .put("users/u2/cart", "x", Fields::new(), WriteMode::Replace)
            .await
            .unwrap();
        store
            .put("users/u1/cart", "y", Fields::new(), WriteMode::Replace)
            .await
            .unwrap();
        assert!(sub.changed().await);

        drop(sub);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_faults() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("orders", "o1").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());
        store.set_offline(false);

        store.fail_next_deletes(1);
        assert!(store.delete("orders", "o1").await.is_err());
        assert!(store.delete("orders", "o1").await.is_ok());

        store.fail_puts_to("orders").await;
        assert!(store
            .put("orders", "o1", Fields::new(), WriteMode::Replace)
            .await
            .is_err());
        store.restore().await;
        assert!(store
            .put("orders", "o1", Fields::new(), WriteMode::Replace)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_server_timestamp_strictly_increases() {
        let store = MemoryStore::new();
        let a = store.server_timestamp().await.unwrap();
        let b = store.server_timestamp().await.unwrap();
        assert!(b > a);
    }
}
