//! Per-user cart service.
//!
//! Cart lines live in the `users/{uid}/cart` collection, one document per
//! [`LineKey`]. Every mutation for a user runs under that user's async lock,
//! so concurrent requests from one customer apply one at a time while other
//! customers never wait on each other.
//!
//! Cart clears that fail part-way (after an order was already stored) are
//! recorded and finished on the user's next cart interaction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use ajeborush_core::cart::plan_decrement;
use ajeborush_core::pricing::{self, PriceError};
use ajeborush_core::{CartLine, DecrementPlan, LineKey, Product, ProductId, UserId, Variant};
use moka::future::Cache;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use crate::config::CartConfig;
use crate::store::{
    self, Direction, DocumentStore, Fields, Query, StoreError, Subscription, WriteMode,
    collections,
};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Price(#[from] PriceError),

    #[error("quantity must be at least 1")]
    QuantityBelowMinimum,

    #[error("cart line {0} not found")]
    LineNotFound(LineKey),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Some lines could not be deleted after every retry.
    #[error("{remaining} cart line(s) could not be cleared: {source}")]
    ClearIncomplete {
        remaining: usize,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a single decrement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// Quantity went down by one; the updated line.
    Decremented(CartLine),
    /// The line is at one unit. Nothing was written; removal must be
    /// confirmed through [`CartStore::remove_line`].
    NeedsConfirmation(CartLine),
}

/// Bounded retry for cart clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per line, at least one.
    pub attempts: u32,
    /// Pause between attempts.
    pub pause: Duration,
}

impl From<&CartConfig> for RetryPolicy {
    fn from(config: &CartConfig) -> Self {
        Self {
            attempts: config.clear_attempts.max(1),
            pause: config.retry_pause,
        }
    }
}

/// Lines that survived a failed clear.
#[derive(Debug)]
pub struct ClearFailure {
    pub remaining: Vec<LineKey>,
    pub source: StoreError,
}

/// Per-user async locks. An entry lives only while a guard holds or waits
/// on it, so a held lock is never replaced.
#[derive(Default)]
struct LockTable {
    entries: std::sync::Mutex<HashMap<UserId, Weak<Mutex<()>>>>,
}

impl LockTable {
    fn handle(&self, user: &UserId) -> Arc<Mutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mutex) = entries.get(user).and_then(Weak::upgrade) {
            return mutex;
        }
        let mutex = Arc::new(Mutex::new(()));
        entries.insert(user.clone(), Arc::downgrade(&mutex));
        mutex
    }

    /// Drop the entry when `held` has no other holders or waiters.
    fn release(&self, user: &UserId, held: &Arc<Mutex<()>>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(held) == 1 {
            entries.remove(user);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Per-user cart operations over a document store.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn DocumentStore>,
    locks: Arc<LockTable>,
    pending_cleanup: Cache<UserId, Arc<Vec<LineKey>>>,
    retry: RetryPolicy,
}

impl CartStore {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: &CartConfig) -> Self {
        Self {
            store,
            locks: Arc::default(),
            pending_cleanup: Cache::builder().build(),
            retry: RetryPolicy::from(config),
        }
    }

    /// Acquire the user's cart lock. Held until the guard is dropped.
    pub(crate) async fn lock(&self, user: &UserId) -> CartGuard<'_> {
        let mutex = self.locks.handle(user);
        CartGuard {
            cart: self,
            user: user.clone(),
            held: mutex.lock_owned().await,
        }
    }

    /// Add `delta` units of `product` at `variant`.
    ///
    /// The first add resolves and freezes the unit price. Later adds of the
    /// same product and variant only raise the quantity.
    ///
    /// # Errors
    ///
    /// - `CartError::Price` if no price can be resolved (nothing is written)
    /// - `CartError::QuantityBelowMinimum` if `delta` is zero
    /// - `CartError::Store` on store failure
    #[instrument(skip(self, product), fields(user_id = %user, item_id = %product.id))]
    pub async fn upsert_line(
        &self,
        user: &UserId,
        product: &Product,
        variant: Option<&Variant>,
        delta: u32,
    ) -> Result<CartLine, CartError> {
        if delta == 0 {
            return Err(CartError::QuantityBelowMinimum);
        }
        let resolved = pricing::resolve(product, variant)?;
        let key = LineKey::for_item(&product.id, resolved.variant_key.as_deref());

        let guard = self.lock(user).await;
        guard.repair().await?;

        if let Some(mut line) = guard.line(&key).await? {
            line.quantity = line.quantity.saturating_add(delta);
            guard.write_quantity(&key, line.quantity).await?;
            tracing::debug!(line = %key, quantity = line.quantity, "cart line incremented");
            return Ok(line);
        }

        let line = CartLine {
            id: key.clone(),
            item_id: product.id.clone(),
            variant_key: resolved.variant_key,
            name: resolved.name,
            unit_price: resolved.unit_price,
            image_ref: product.image_ref.clone(),
            quantity: delta,
            product_type: product.product_type,
            added_at: self.store.server_timestamp().await?,
        };
        store::put_as(
            self.store.as_ref(),
            &collections::cart(user),
            key.as_str(),
            &line,
            WriteMode::Replace,
        )
        .await?;
        tracing::debug!(line = %key, "cart line created");
        Ok(line)
    }

    /// Set a line's quantity. Zero is rejected; use
    /// [`remove_line`](Self::remove_line) to delete.
    ///
    /// # Errors
    ///
    /// - `CartError::QuantityBelowMinimum` for zero
    /// - `CartError::LineNotFound` if the line doesn't exist
    /// - `CartError::Store` on store failure
    #[instrument(skip(self), fields(user_id = %user, line = %key))]
    pub async fn set_line_quantity(
        &self,
        user: &UserId,
        key: &LineKey,
        quantity: u32,
    ) -> Result<CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::QuantityBelowMinimum);
        }
        let guard = self.lock(user).await;
        guard.repair().await?;
        let mut line = guard
            .line(key)
            .await?
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;
        line.quantity = quantity;
        guard.write_quantity(key, quantity).await?;
        Ok(line)
    }

    /// Raise a line's quantity by one.
    ///
    /// # Errors
    ///
    /// `CartError::LineNotFound` or `CartError::Store`.
    #[instrument(skip(self), fields(user_id = %user, line = %key))]
    pub async fn increment(&self, user: &UserId, key: &LineKey) -> Result<CartLine, CartError> {
        let guard = self.lock(user).await;
        guard.repair().await?;
        let mut line = guard
            .line(key)
            .await?
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;
        line.quantity = line.quantity.saturating_add(1);
        guard.write_quantity(key, line.quantity).await?;
        Ok(line)
    }

    /// Lower a line's quantity by one, or report that removal needs
    /// confirmation when it is at one unit.
    ///
    /// # Errors
    ///
    /// `CartError::LineNotFound` or `CartError::Store`.
    #[instrument(skip(self), fields(user_id = %user, line = %key))]
    pub async fn decrement(
        &self,
        user: &UserId,
        key: &LineKey,
    ) -> Result<DecrementOutcome, CartError> {
        let guard = self.lock(user).await;
        guard.repair().await?;
        let mut line = guard
            .line(key)
            .await?
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;

        match plan_decrement(line.quantity) {
            DecrementPlan::SetQuantity(quantity) => {
                guard.write_quantity(key, quantity).await?;
                line.quantity = quantity;
                Ok(DecrementOutcome::Decremented(line))
            }
            DecrementPlan::ConfirmRemoval => Ok(DecrementOutcome::NeedsConfirmation(line)),
        }
    }

    /// Delete a line. Removing a missing line succeeds.
    ///
    /// # Errors
    ///
    /// `CartError::Store` on store failure.
    #[instrument(skip(self), fields(user_id = %user, line = %key))]
    pub async fn remove_line(&self, user: &UserId, key: &LineKey) -> Result<(), CartError> {
        let guard = self.lock(user).await;
        guard.repair().await?;
        self.store
            .delete(&collections::cart(user), key.as_str())
            .await?;
        tracing::debug!("cart line removed");
        Ok(())
    }

    /// Current lines, oldest first. Empty for a user who never added
    /// anything.
    ///
    /// # Errors
    ///
    /// `CartError::Store` on store failure.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn list_lines(&self, user: &UserId) -> Result<Vec<CartLine>, CartError> {
        let guard = self.lock(user).await;
        if let Err(e) = guard.repair().await {
            tracing::warn!(error = %e, "pending cart cleanup still failing");
        }
        guard.lines().await
    }

    /// Delete every line, retrying each failed delete per the retry policy.
    ///
    /// # Errors
    ///
    /// `CartError::ClearIncomplete` if some lines are left after all
    /// attempts. They are finished on the next cart interaction.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear(&self, user: &UserId) -> Result<(), CartError> {
        let guard = self.lock(user).await;
        guard.clear().await.map_err(|failure| CartError::ClearIncomplete {
            remaining: failure.remaining.len(),
            source: failure.source,
        })
    }

    /// Live view of a user's cart. The first [`CartSubscription::next`]
    /// yields the current lines; later calls wait for a change.
    #[must_use]
    pub fn subscribe(&self, user: &UserId) -> CartSubscription {
        CartSubscription {
            cart: self.clone(),
            user: user.clone(),
            changes: self
                .store
                .subscribe(&collections::cart(user), Query::all()),
            primed: false,
        }
    }

    /// Keys awaiting cleanup for `user`.
    pub async fn pending_cleanup(&self, user: &UserId) -> Vec<LineKey> {
        self.pending_cleanup
            .get(user)
            .await
            .map(|keys| keys.as_ref().clone())
            .unwrap_or_default()
    }

    async fn delete_with_retry(&self, collection: &str, key: &LineKey) -> Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.delete(collection, key.as_str()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry.attempts => {
                    tracing::debug!(line = %key, attempt, error = %e, "retrying cart line delete");
                    attempt += 1;
                    if !self.retry.pause.is_zero() {
                        tokio::time::sleep(self.retry.pause).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exclusive access to one user's cart.
pub(crate) struct CartGuard<'a> {
    cart: &'a CartStore,
    user: UserId,
    held: OwnedMutexGuard<()>,
}

impl Drop for CartGuard<'_> {
    fn drop(&mut self) {
        self.cart
            .locks
            .release(&self.user, OwnedMutexGuard::mutex(&self.held));
    }
}

impl CartGuard<'_> {
    fn collection(&self) -> String {
        collections::cart(&self.user)
    }

    async fn line(&self, key: &LineKey) -> Result<Option<CartLine>, CartError> {
        Ok(store::get_as(self.cart.store.as_ref(), &self.collection(), key.as_str()).await?)
    }

    async fn write_quantity(&self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        let mut fields = Fields::new();
        fields.insert("quantity".to_string(), json!(quantity));
        self.cart
            .store
            .put(&self.collection(), key.as_str(), fields, WriteMode::Merge)
            .await?;
        Ok(())
    }

    /// Current lines, oldest first, excluding any still awaiting cleanup.
    pub(crate) async fn lines(&self) -> Result<Vec<CartLine>, CartError> {
        let query = Query::all().order_by("addedAt", Direction::Ascending);
        let mut lines: Vec<CartLine> =
            store::query_as(self.cart.store.as_ref(), &self.collection(), &query).await?;
        let pending = self.cart.pending_cleanup(&self.user).await;
        if !pending.is_empty() {
            lines.retain(|line| !pending.contains(&line.id));
        }
        Ok(lines)
    }

    /// Delete every line currently in the cart.
    pub(crate) async fn clear(&self) -> Result<(), ClearFailure> {
        let documents = self
            .cart
            .store
            .query(&self.collection(), &Query::all())
            .await
            .map_err(|source| ClearFailure {
                remaining: Vec::new(),
                source,
            })?;
        self.clear_lines(documents.into_iter().map(|d| LineKey::from(d.id)).collect())
            .await
    }

    /// Delete the given lines.
    ///
    /// The keys are recorded for cleanup before the first delete, so a line
    /// that can't be deleted stays hidden and is removed on the next
    /// interaction.
    pub(crate) async fn clear_lines(&self, keys: Vec<LineKey>) -> Result<(), ClearFailure> {
        if keys.is_empty() {
            return Ok(());
        }
        self.cart
            .pending_cleanup
            .insert(self.user.clone(), Arc::new(keys.clone()))
            .await;

        let collection = self.collection();
        let mut remaining = Vec::new();
        let mut last_error = None;
        for key in keys {
            if let Err(e) = self.cart.delete_with_retry(&collection, &key).await {
                remaining.push(key);
                last_error = Some(e);
            }
        }

        match last_error {
            None => {
                self.cart.pending_cleanup.invalidate(&self.user).await;
                Ok(())
            }
            Some(source) => {
                tracing::warn!(
                    user_id = %self.user,
                    remaining = remaining.len(),
                    error = %source,
                    "cart clear incomplete, recording cleanup"
                );
                self.cart
                    .pending_cleanup
                    .insert(self.user.clone(), Arc::new(remaining.clone()))
                    .await;
                Err(ClearFailure { remaining, source })
            }
        }
    }

    /// Finish any cleanup left by an earlier failed clear.
    pub(crate) async fn repair(&self) -> Result<(), StoreError> {
        let pending = self.cart.pending_cleanup(&self.user).await;
        if pending.is_empty() {
            return Ok(());
        }

        let collection = self.collection();
        let mut still_pending = Vec::new();
        let mut last_error = None;
        for key in pending {
            if let Err(e) = self.cart.delete_with_retry(&collection, &key).await {
                still_pending.push(key);
                last_error = Some(e);
            }
        }

        match last_error {
            None => {
                tracing::info!(user_id = %self.user, "pending cart cleanup finished");
                self.cart.pending_cleanup.invalidate(&self.user).await;
                Ok(())
            }
            Some(e) => {
                self.cart
                    .pending_cleanup
                    .insert(self.user.clone(), Arc::new(still_pending))
                    .await;
                Err(e)
            }
        }
    }
}

/// Live cart snapshots for one user. Dropping it releases the underlying
/// store subscription.
pub struct CartSubscription {
    cart: CartStore,
    user: UserId,
    changes: Subscription,
    primed: bool,
}

impl CartSubscription {
    /// Next snapshot of the cart, or `None` once the store shuts down.
    pub async fn next(&mut self) -> Option<Result<Vec<CartLine>, CartError>> {
        if self.primed {
            if !self.changes.changed().await {
                return None;
            }
        } else {
            self.primed = true;
        }
        Some(self.cart.list_lines(&self.user).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ajeborush_core::{Portion, ProductType};
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::MemoryStore;

    fn cart_with(store: Arc<MemoryStore>) -> CartStore {
        let config = CartConfig {
            retry_pause: Duration::ZERO,
            ..CartConfig::default()
        };
        CartStore::new(store, &config)
    }

    fn jollof() -> Product {
        Product {
            id: ProductId::new("jollof"),
            name: "Jollof".to_string(),
            description: String::new(),
            image_ref: "jollof.jpg".to_string(),
            product_type: ProductType::Catering,
            price: None,
            original_price: None,
            discounted_price: None,
            full_price: Some(Decimal::from(40)),
            half_price: Some(Decimal::from(25)),
            sizes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn full() -> Variant {
        Variant::Portion(Portion::Full)
    }

    #[tokio::test]
    async fn test_upsert_merges_same_key() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");

        cart.upsert_line(&user, &jollof(), Some(&full()), 1).await.unwrap();
        let line = cart.upsert_line(&user, &jollof(), Some(&full()), 2).await.unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.id.as_str(), "jollof-Full");

        let lines = cart.list_lines(&user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_price_error_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cart = cart_with(store.clone());
        let user = UserId::new("u1");
        let err = cart.upsert_line(&user, &jollof(), None, 1).await.unwrap_err();
        assert!(matches!(err, CartError::Price(PriceError::PortionRequired { .. })));
        assert_eq!(store.document_count("users/u1/cart").await, 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");
        let line = cart.upsert_line(&user, &jollof(), Some(&full()), 1).await.unwrap();
        assert!(matches!(
            cart.set_line_quantity(&user, &line.id, 0).await,
            Err(CartError::QuantityBelowMinimum)
        ));
        assert!(matches!(
            cart.upsert_line(&user, &jollof(), Some(&full()), 0).await,
            Err(CartError::QuantityBelowMinimum)
        ));
        assert_eq!(cart.list_lines(&user).await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_decrement_at_one_needs_confirmation() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");
        let line = cart.upsert_line(&user, &jollof(), Some(&full()), 2).await.unwrap();

        let first = cart.decrement(&user, &line.id).await.unwrap();
        assert!(matches!(first, DecrementOutcome::Decremented(ref l) if l.quantity == 1));

        let second = cart.decrement(&user, &line.id).await.unwrap();
        assert!(matches!(second, DecrementOutcome::NeedsConfirmation(_)));
        assert_eq!(cart.list_lines(&user).await.unwrap().len(), 1);

        cart.remove_line(&user, &line.id).await.unwrap();
        cart.remove_line(&user, &line.id).await.unwrap();
        assert!(cart.list_lines(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_line() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");
        assert!(matches!(
            cart.increment(&user, &LineKey::from("ghost")).await,
            Err(CartError::LineNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_retries_transient_failures() {
        let store = Arc::new(MemoryStore::new());
        let cart = cart_with(store.clone());
        let user = UserId::new("u1");
        cart.upsert_line(&user, &jollof(), Some(&full()), 1).await.unwrap();
        cart.upsert_line(&user, &jollof(), Some(&Variant::Portion(Portion::Half)), 1)
            .await
            .unwrap();

        // Two failures fit inside three attempts for the first line.
        store.fail_next_deletes(2);
        cart.clear(&user).await.unwrap();
        assert!(cart.list_lines(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_clear_is_finished_later() {
        let store = Arc::new(MemoryStore::new());
        let cart = cart_with(store.clone());
        let user = UserId::new("u1");
        cart.upsert_line(&user, &jollof(), Some(&full()), 1).await.unwrap();

        store.fail_next_deletes(3);
        let err = cart.clear(&user).await.unwrap_err();
        assert!(matches!(err, CartError::ClearIncomplete { remaining: 1, .. }));
        assert_eq!(cart.pending_cleanup(&user).await.len(), 1);
        // The next interaction finishes the cleanup.
        assert!(cart.list_lines(&user).await.unwrap().is_empty());
        assert!(cart.pending_cleanup(&user).await.is_empty());
        assert_eq!(store.document_count("users/u1/cart").await, 0);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        cart.upsert_line(&UserId::new("a"), &jollof(), Some(&full()), 1)
            .await
            .unwrap();
        assert!(cart.list_lines(&UserId::new("b")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_held_lock_blocks_until_released() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");
        let guard = cart.lock(&user).await;

        let waiter = {
            let cart = cart.clone();
            let user = user.clone();
            tokio::spawn(async move {
                let _guard = cart.lock(&user).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(cart.locks.len(), 1);

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_dropped_after_release() {
        let cart = cart_with(Arc::new(MemoryStore::new()));
        cart.upsert_line(&UserId::new("a"), &jollof(), Some(&full()), 1)
            .await
            .unwrap();
        cart.list_lines(&UserId::new("b")).await.unwrap();
        assert_eq!(cart.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_subscription_primes_then_follows_changes() {
        let store = Arc::new(MemoryStore::new());
        let cart = cart_with(store.clone());
        let user = UserId::new("u1");

        let mut sub = cart.subscribe(&user);
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        cart.upsert_line(&user, &jollof(), Some(&full()), 1).await.unwrap();
        let lines = sub.next().await.unwrap().unwrap();
        assert_eq!(lines.len(), 1);

        drop(sub);
        assert_eq!(store.subscriber_count(), 0);
    }
}
