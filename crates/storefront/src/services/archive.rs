//! Order archive: a customer's past orders and custom requests, newest first.

use std::sync::Arc;

use ajeborush_core::{CustomRequest, Email, Order, OrderId, RequestId, UserId};
use tracing::instrument;

use crate::store::{self, Direction, DocumentStore, Query, StoreError, collections};

/// Read-only view over stored orders and custom requests.
#[derive(Clone)]
pub struct OrderArchive {
    store: Arc<dyn DocumentStore>,
}

fn newest_first() -> Query {
    Query::all().order_by("createdAt", Direction::Descending)
}

impl OrderArchive {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Orders placed by `user`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on store failure.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn list_orders(&self, user: &UserId) -> Result<Vec<Order>, StoreError> {
        let query = newest_first().where_eq("userId", user.as_str());
        store::query_as(self.store.as_ref(), collections::ORDERS, &query).await
    }

    /// Custom requests filed under `email`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on store failure.
    #[instrument(skip(self))]
    pub async fn list_custom_requests(
        &self,
        email: &Email,
    ) -> Result<Vec<CustomRequest>, StoreError> {
        let query = newest_first().where_eq("contactEmail", email.as_str());
        store::query_as(self.store.as_ref(), collections::CUSTOM_REQUESTS, &query).await
    }

    /// Every order, for the admin panel.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on store failure.
    pub async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        store::query_as(self.store.as_ref(), collections::ORDERS, &newest_first()).await
    }

    /// Every custom request, for the admin panel.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on store failure.
    pub async fn all_custom_requests(&self) -> Result<Vec<CustomRequest>, StoreError> {
        store::query_as(
            self.store.as_ref(),
            collections::CUSTOM_REQUESTS,
            &newest_first(),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError` on store failure.
    pub async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        store::get_as(self.store.as_ref(), collections::ORDERS, id.as_str()).await
    }

    /// # Errors
    ///
    /// Returns `StoreError` on store failure.
    pub async fn get_custom_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<CustomRequest>, StoreError> {
        store::get_as(self.store.as_ref(), collections::CUSTOM_REQUESTS, id.as_str()).await
    }
}
