//! `PostgreSQL` document store.
//!
//! All collections share one `documents` table with a JSONB `fields` column.
//! Merge writes use `fields || EXCLUDED.fields`, which overlays top-level
//! keys the same way [`MemoryStore`](super::MemoryStore) does. Equality
//! filters are sent as `fields @> {"field": value}` so the `jsonb_path_ops`
//! GIN index serves them.
//!
//! Change notifications are broadcast in-process only, so subscribers see
//! writes made through this instance.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::migrate::Migrator;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::broadcast;

use super::{
    CHANGE_CHANNEL_CAPACITY, Change, ChangeKind, Document, DocumentStore, Fields, Query,
    StoreError, Subscription, WriteMode,
};

/// Embedded migrations for the document table.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Document store over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    changes: broadcast::Sender<Arc<Change>>,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// Connect using the storefront pool settings.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the connection cannot be established.
    pub async fn connect(database_url: &SecretString) -> Result<Self, StoreError> {
        let pool = crate::db::create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))
    }

    fn notify(&self, change: Change) {
        let _ = self.changes.send(Arc::new(change));
    }
}

fn into_fields(value: Value, id: &str) -> Result<Fields, StoreError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::DataCorruption(format!(
            "document {id} is not an object: {other}"
        ))),
    }
}

/// One-key object matched with `@>` for an equality filter.
fn containment(field: &str, value: &Value) -> Value {
    let mut object = Fields::new();
    object.insert(field.to_owned(), value.clone());
    Value::Object(object)
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT fields FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(Json(value),)| {
            Ok(Document {
                id: id.to_string(),
                fields: into_fields(value, id)?,
            })
        })
        .transpose()
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let sql = match mode {
            WriteMode::Merge => {
                "INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)
                 ON CONFLICT (collection, id) DO UPDATE
                 SET fields = documents.fields || EXCLUDED.fields, updated_at = now()
                 RETURNING fields"
            }
            WriteMode::Replace => {
                "INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)
                 ON CONFLICT (collection, id) DO UPDATE
                 SET fields = EXCLUDED.fields, updated_at = now()
                 RETURNING fields"
            }
        };

        let (Json(stored),): (Json<Value>,) = sqlx::query_as(sql)
            .bind(collection)
            .bind(id)
            .bind(Json(Value::Object(fields)))
            .fetch_one(&self.pool)
            .await?;

        self.notify(Change {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Upserted,
            fields: Some(into_fields(stored, id)?),
        });
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
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
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, fields FROM documents WHERE collection = ");
        builder.push_bind(collection);
        for (field, value) in &query.filters {
            builder.push(" AND fields @> ");
            builder.push_bind(Json(containment(field, value)));
        }

        let rows: Vec<(String, Json<Value>)> =
            builder.build_query_as().fetch_all(&self.pool).await?;

        let mut documents = rows
            .into_iter()
            .map(|(id, Json(value))| {
                let fields = into_fields(value, &id)?;
                Ok(Document { id, fields })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        // Sorting happens here so timestamps compare as instants, not text.
        query.sort(&mut documents);
        Ok(documents)
    }

    fn subscribe(&self, collection: &str, query: Query) -> Subscription {
        Subscription::new(collection, query, self.changes.subscribe())
    }

    async fn server_timestamp(&self) -> Result<DateTime<Utc>, StoreError> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_containment_wraps_single_field() {
        assert_eq!(
            containment("userId", &json!("u1")),
            json!({ "userId": "u1" })
        );
    }

    #[test]
    fn test_containment_keeps_value_type() {
        assert_eq!(containment("rating", &json!(5)), json!({ "rating": 5 }));
        assert_eq!(containment("status", &Value::Null), json!({ "status": null }));
    }
}
