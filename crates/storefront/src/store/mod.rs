//! Document store abstraction.
//!
//! Every record the storefront keeps (products, cart lines, orders, custom
//! requests, contact messages, reviews) is a JSON document addressed by
//! `(collection, id)`. Field names are camelCase. The `id` of a document is
//! not stored in its fields; [`Document::decode`] merges it back in under
//! `"id"` and [`encode`] strips it.
//!
//! Two backends ship:
//! - [`MemoryStore`] - in-process maps, for development and tests
//! - [`PostgresStore`] - a single JSONB table
//!
//! Subscriptions are owned handles over a broadcast channel. Dropping a
//! [`Subscription`] deregisters it.

pub mod collections;
pub mod memory;
pub mod postgres;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Document body: a JSON object without the `id`.
pub type Fields = serde_json::Map<String, Value>;

/// Broadcast capacity for change notifications.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached. Callers may retry.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document could not be read back as its expected type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            other => Self::Database(other),
        }
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decode into `T`, with the document id available as the `id` field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DataCorruption` if the fields don't match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::DataCorruption(format!("document {}: {e}", self.id)))
    }
}

/// Encode `value` as document fields, dropping any `id` field.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if `value` does not serialize to a
/// JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::DataCorruption(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// How `put` treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overlay the given fields on the existing document (keyed upsert).
    Merge,
    /// Replace the document wholesale.
    Replace,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Sort key for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filters plus an optional sort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Everything in the collection, unsorted.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a `field == value` filter.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Sort by `field`.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Whether a document's fields satisfy every filter.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }

    /// Sort documents in place. Ties fall back to the document id so results
    /// are deterministic.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some(order_by) = &self.order_by else {
            return;
        };
        documents.sort_by(|a, b| {
            let ordering = compare_values(
                a.fields.get(&order_by.field),
                b.fields.get(&order_by.field),
            )
            .then_with(|| a.id.cmp(&b.id));
            match order_by.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
    }
}

/// Order two field values. Missing and `null` sort first; RFC 3339 strings
/// compare as instants; numbers compare numerically.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
    /// Full document after the write; `None` for deletes.
    pub fields: Option<Fields>,
}

/// Live handle on changes to a collection.
///
/// Holding it keeps the registration alive; dropping it releases it.
#[derive(Debug)]
pub struct Subscription {
    collection: String,
    query: Query,
    receiver: broadcast::Receiver<Arc<Change>>,
}

impl Subscription {
    pub(crate) fn new(
        collection: impl Into<String>,
        query: Query,
        receiver: broadcast::Receiver<Arc<Change>>,
    ) -> Self {
        Self {
            collection: collection.into(),
            query,
            receiver,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Wait for the next relevant change.
    ///
    /// Returns `false` once the store has shut down. A lagged receiver is
    /// reported as a change since the caller re-reads anyway.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.is_relevant(&change) => return true,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        collection = %self.collection,
                        skipped,
                        "subscription lagged, forcing refresh"
                    );
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }

    fn is_relevant(&self, change: &Change) -> bool {
        if change.collection != self.collection {
            return false;
        }
        match (&change.kind, &change.fields) {
            (ChangeKind::Upserted, Some(fields)) => self.query.matches(fields),
            // Deletes carry no fields to filter on.
            _ => true,
        }
    }
}

/// A keyed JSON document store.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document, creating it if needed.
    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Documents matching `query`, sorted as requested.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Register for change notifications on `collection`.
    fn subscribe(&self, collection: &str, query: Query) -> Subscription;

    /// Current time according to the store.
    async fn server_timestamp(&self) -> Result<DateTime<Utc>, StoreError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Fetch and decode one document.
///
/// # Errors
///
/// Propagates store errors and decode failures.
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(collection, id)
        .await?
        .map(|doc| doc.decode())
        .transpose()
}

/// Run a query and decode every result.
///
/// # Errors
///
/// Propagates store errors and decode failures.
pub async fn query_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    query: &Query,
) -> Result<Vec<T>, StoreError> {
    store
        .query(collection, query)
        .await?
        .iter()
        .map(Document::decode)
        .collect()
}

/// Encode `value` and write it under `id`.
///
/// # Errors
///
/// Propagates store errors and encode failures.
pub async fn put_as<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    value: &T,
    mode: WriteMode,
) -> Result<(), StoreError> {
    store.put(collection, id, encode(value)?, mode).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        id: String,
        body_text: String,
    }

    fn doc(id: &str, value: Value) -> Document {
        match value {
            Value::Object(fields) => Document {
                id: id.to_string(),
                fields,
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_encode_strips_id_and_decode_restores_it() {
        let note = Note {
            id: "n1".to_string(),
            body_text: "hi".to_string(),
        };
        let fields = encode(&note).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["bodyText"], "hi");

        let back: Note = Document {
            id: "n1".to_string(),
            fields,
        }
        .decode()
        .unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_decode_mismatch_is_corruption() {
        let d = doc("n1", json!({"bodyText": 5}));
        assert!(matches!(
            d.decode::<Note>(),
            Err(StoreError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_query_matches_equality_filters() {
        let q = Query::all().where_eq("userId", "u1");
        let yes = doc("a", json!({"userId": "u1"}));
        let no = doc("b", json!({"userId": "u2"}));
        let missing = doc("c", json!({}));
        assert!(q.matches(&yes.fields));
        assert!(!q.matches(&no.fields));
        assert!(!q.matches(&missing.fields));
    }

    #[test]
    fn test_sort_by_timestamp_descending() {
        let mut docs = vec![
            doc("old", json!({"createdAt": "2026-01-01T00:00:00Z"})),
            doc("new", json!({"createdAt": "2026-03-01T00:00:00+00:00"})),
            doc("mid", json!({"createdAt": "2026-02-01T00:00:00.5Z"})),
        ];
        Query::all()
            .order_by("createdAt", Direction::Descending)
            .sort(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn test_compare_values_nulls_first() {
        assert_eq!(
            compare_values(None, Some(&json!("2026-01-01T00:00:00Z"))),
            Ordering::Less
        );
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
    }

    #[test]
    fn test_sqlx_pool_timeout_is_transient() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_transient());
    }
}
