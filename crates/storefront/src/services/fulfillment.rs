//! Admin fulfillment: `pending -> completed` for orders and
//! `Unprocessed -> Processed` for custom requests.
//!
//! Both are "set to X" writes. Applying one to a record already in X
//! returns the stored record untouched, including its `fulfilledAt`.

use std::sync::Arc;

use ajeborush_core::{
    CustomRequest, Order, OrderId, OrderStatus, RequestId, RequestStatus, Transition,
    TransitionError,
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::store::{self, DocumentStore, Fields, StoreError, WriteMode, collections};

/// Errors from fulfillment transitions.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Admin-side status transitions.
#[derive(Clone)]
pub struct Fulfillment {
    store: Arc<dyn DocumentStore>,
    // Serializes read-check-write so two admins can't both stamp fulfilledAt.
    writes: Arc<Mutex<()>>,
}

fn status_fields(status: &str, fulfilled_at: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("status".to_string(), Value::String(status.to_string()));
    fields.insert("fulfilledAt".to_string(), json!(fulfilled_at));
    fields
}

impl Fulfillment {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Mark an order completed.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::NotFound` if the order doesn't exist
    /// - `FulfillmentError::InvalidTransition` for a cancelled order
    /// - `FulfillmentError::Store` on store failure
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn complete_order(&self, id: &OrderId) -> Result<Order, FulfillmentError> {
        let _held = self.writes.lock().await;
        let mut order: Order =
            store::get_as(self.store.as_ref(), collections::ORDERS, id.as_str())
                .await?
                .ok_or_else(|| FulfillmentError::NotFound(format!("order {id}")))?;

        if order.status.complete()? == Transition::AlreadyApplied {
            tracing::debug!("order already completed");
            return Ok(order);
        }

        let now = self.store.server_timestamp().await?;
        self.store
            .put(
                collections::ORDERS,
                id.as_str(),
                status_fields(OrderStatus::Completed.as_str(), now),
                WriteMode::Merge,
            )
            .await?;
        order.status = OrderStatus::Completed;
        order.fulfilled_at = Some(now);
        tracing::info!("order completed");
        Ok(order)
    }

    /// Mark a custom request processed.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::NotFound` if the request doesn't exist
    /// - `FulfillmentError::Store` on store failure
    #[instrument(skip(self), fields(request_id = %id))]
    pub async fn process_request(&self, id: &RequestId) -> Result<CustomRequest, FulfillmentError> {
        let _held = self.writes.lock().await;
        let mut request: CustomRequest =
            store::get_as(self.store.as_ref(), collections::CUSTOM_REQUESTS, id.as_str())
                .await?
                .ok_or_else(|| FulfillmentError::NotFound(format!("custom request {id}")))?;

        if request.status.process() == Transition::AlreadyApplied {
            return Ok(request);
        }

        let now = self.store.server_timestamp().await?;
        self.store
            .put(
                collections::CUSTOM_REQUESTS,
                id.as_str(),
                status_fields(RequestStatus::Processed.as_str(), now),
                WriteMode::Merge,
            )
            .await?;
        request.status = RequestStatus::Processed;
        request.fulfilled_at = Some(now);
        tracing::info!("custom request processed");
        Ok(request)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seed_order(store: &MemoryStore, id: &str, status: &str) {
        let value = json!({
            "userId": "u1",
            "customerName": "Ada",
            "contactEmail": "ada@example.com",
            "shippingAddress": {"street": "1 A St", "city": "Dallas", "state": "TX", "zip": "75201"},
            "lineItems": [],
            "totalAmount": "10.00",
            "status": status,
            "createdAt": "2026-01-01T00:00:00Z"
        });
        if let Value::Object(fields) = value {
            store
                .put(collections::ORDERS, id, fields, WriteMode::Replace)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_complete_is_one_way_and_idempotent() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "pending").await;
        let fulfillment = Fulfillment::new(store.clone());

        let first = fulfillment.complete_order(&OrderId::new("o1")).await.unwrap();
        assert_eq!(first.status, OrderStatus::Completed);
        let stamped = first.fulfilled_at.unwrap();

        let second = fulfillment.complete_order(&OrderId::new("o1")).await.unwrap();
        assert_eq!(second.fulfilled_at, Some(stamped));

        let stored = store.get(collections::ORDERS, "o1").await.unwrap().unwrap();
        assert_eq!(stored.fields["status"], "completed");
        assert_eq!(stored.fields["totalAmount"], "10.00");
    }

    #[tokio::test]
    async fn test_cancelled_order_rejected() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "cancelled").await;
        let fulfillment = Fulfillment::new(store);
        assert!(matches!(
            fulfillment.complete_order(&OrderId::new("o1")).await,
            Err(FulfillmentError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_records() {
        let fulfillment = Fulfillment::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            fulfillment.complete_order(&OrderId::new("nope")).await,
            Err(FulfillmentError::NotFound(_))
        ));
        assert!(matches!(
            fulfillment.process_request(&RequestId::new("nope")).await,
            Err(FulfillmentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_process_request_without_status() {
        let store = Arc::new(MemoryStore::new());
        if let Value::Object(fields) = json!({
            "name": "Tolu",
            "contactEmail": "tolu@example.com",
            "category": "catering",
            "description": "Small chops",
            "createdAt": "2026-01-01T00:00:00Z"
        }) {
            store
                .put(collections::CUSTOM_REQUESTS, "r1", fields, WriteMode::Replace)
                .await
                .unwrap();
        }
        let fulfillment = Fulfillment::new(store);
        let processed = fulfillment.process_request(&RequestId::new("r1")).await.unwrap();
        assert_eq!(processed.status, RequestStatus::Processed);
        assert!(processed.fulfilled_at.is_some());
    }
}
