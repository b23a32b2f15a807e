//! Product catalog.
//!
//! Editing or deleting a product never touches cart lines or orders; those
//! carry their own frozen copies of name and price.

use std::sync::Arc;

use ajeborush_core::{Product, ProductDraft, ProductId, ProductType};
use tracing::instrument;

use super::ServiceError;
use crate::store::{self, Direction, DocumentStore, Query, WriteMode, collections};

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

impl Catalog {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Store` on store failure.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, ServiceError> {
        Ok(store::get_as(self.store.as_ref(), collections::PRODUCTS, id.as_str()).await?)
    }

    /// Products, newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` on store failure.
    pub async fn list(&self, product_type: Option<ProductType>) -> Result<Vec<Product>, ServiceError> {
        let mut query = Query::all().order_by("createdAt", Direction::Descending);
        if let Some(product_type) = product_type {
            query = query.where_eq("type", product_type.as_str());
        }
        Ok(store::query_as(self.store.as_ref(), collections::PRODUCTS, &query).await?)
    }

    /// Create a product with a generated id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an invalid draft.
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, ServiceError> {
        self.put(ProductId::generate(), draft).await
    }

    /// Create or replace the product stored under `id`.
    ///
    /// An existing product keeps its `createdAt`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an invalid draft.
    #[instrument(skip(self, draft), fields(product_id = %id))]
    pub async fn put(&self, id: ProductId, draft: ProductDraft) -> Result<Product, ServiceError> {
        draft.validate().map_err(ServiceError::Validation)?;
        let created_at = match self.get(&id).await? {
            Some(existing) => existing.created_at,
            None => self.store.server_timestamp().await?,
        };
        let product = Product::from_draft(id, draft, created_at);
        store::put_as(
            self.store.as_ref(),
            collections::PRODUCTS,
            product.id.as_str(),
            &product,
            WriteMode::Replace,
        )
        .await?;
        tracing::info!(name = %product.name, "product saved");
        Ok(product)
    }

    /// Replace an existing product's fields.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if no such product exists
    /// - `ServiceError::Validation` for an invalid draft
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, ServiceError> {
        if self.get(&id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("product {id}")));
        }
        self.put(id, draft).await
    }

    /// Delete a product. Deleting a missing product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` on store failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: &ProductId) -> Result<(), ServiceError> {
        self.store.delete(collections::PRODUCTS, id.as_str()).await?;
        Ok(())
    }
}
