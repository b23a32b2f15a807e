//! Order placement: turns a user's cart into an order.
//!
//! The whole transition runs under the user's cart lock:
//! 1. finish any earlier cleanup, read the lines fresh
//! 2. validate the shipping form (nothing written on failure)
//! 3. persist the order as `pending`
//! 4. delete the lines that went into the order
//!
//! The summary is delivered after the lock is released. A failed clear or a
//! failed delivery never undoes the order; both come back as warnings.

use std::sync::Arc;

use ajeborush_core::{Order, OrderId, ShippingForm, UserId, ValidationErrors};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use super::cart::{CartError, CartStore};
use super::messaging::{Handoff, Messenger};
use crate::store::{self, DocumentStore, StoreError, WriteMode, collections};

/// Errors that stop an order from being placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Form or cart failed validation. Nothing was written.
    #[error("checkout validation failed: {0}")]
    Validation(ValidationErrors),

    /// The cart could not be read. Nothing was written.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The order could not be stored. The cart is intact.
    #[error("order transmission failed: {0}")]
    Transmission(#[source] StoreError),
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Store(e) | CartError::ClearIncomplete { source: e, .. } => {
                Self::StoreUnavailable(e)
            }
            other => Self::StoreUnavailable(StoreError::DataCorruption(other.to_string())),
        }
    }
}

/// Non-fatal problems after the order was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CheckoutWarning {
    /// The order stands but some cart lines are still there. They are
    /// removed on the next cart interaction.
    PartialCommit { remaining: usize },
    /// The summary could not be handed off.
    DeliveryFailure { reason: String },
}

/// A successfully placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: Order,
    pub display_id: String,
    pub cart_cleared: bool,
    pub handoff: Option<Handoff>,
    pub warnings: Vec<CheckoutWarning>,
}

/// Order transition service.
#[derive(Clone)]
pub struct Checkout {
    store: Arc<dyn DocumentStore>,
    cart: CartStore,
    messenger: Messenger,
}

impl Checkout {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, cart: CartStore, messenger: Messenger) -> Self {
        Self {
            store,
            cart,
            messenger,
        }
    }

    /// Place an order from `user`'s current cart.
    ///
    /// Exactly one order is stored per successful call. A second submit of
    /// the same cart waits for the first and then sees an empty cart.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::Validation` for a bad form or an empty cart
    /// - `CheckoutError::StoreUnavailable` if the cart can't be read
    /// - `CheckoutError::Transmission` if the order can't be stored
    #[instrument(skip(self, form), fields(user_id = %user, order_id = tracing::field::Empty))]
    pub async fn place_order(
        &self,
        user: &UserId,
        form: ShippingForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let mut warnings = Vec::new();

        let (order, cart_cleared) = {
            let guard = self.cart.lock(user).await;
            guard.repair().await.map_err(CheckoutError::StoreUnavailable)?;
            let lines = guard.lines().await?;

            let shipping = form
                .validate(lines.is_empty())
                .map_err(CheckoutError::Validation)?;

            let created_at = self
                .store
                .server_timestamp()
                .await
                .map_err(CheckoutError::StoreUnavailable)?;
            let order = Order::place(OrderId::generate(), user.clone(), shipping, &lines, created_at);
            tracing::Span::current().record("order_id", order.id.as_str());

            store::put_as(
                self.store.as_ref(),
                collections::ORDERS,
                order.id.as_str(),
                &order,
                WriteMode::Replace,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to store order");
                CheckoutError::Transmission(e)
            })?;
            tracing::info!(
                total = %order.total_amount,
                lines = order.line_items.len(),
                units = order.unit_count(),
                "order placed"
            );

            let keys = lines.iter().map(|line| line.id.clone()).collect();
            let cart_cleared = match guard.clear_lines(keys).await {
                Ok(()) => true,
                Err(failure) => {
                    tracing::warn!(
                        remaining = failure.remaining.len(),
                        error = %failure.source,
                        "order stored but cart not fully cleared"
                    );
                    warnings.push(CheckoutWarning::PartialCommit {
                        remaining: failure.remaining.len(),
                    });
                    false
                }
            };
            (order, cart_cleared)
        };

        let handoff = match self.messenger.deliver(&order.summary()).await {
            Ok(handoff) => Some(handoff),
            Err(e) => {
                tracing::warn!(error = %e, "order summary delivery failed");
                warnings.push(CheckoutWarning::DeliveryFailure {
                    reason: e.to_string(),
                });
                None
            }
        };

        Ok(PlacedOrder {
            display_id: order.display_id(),
            order,
            cart_cleared,
            handoff,
            warnings,
        })
    }
}
