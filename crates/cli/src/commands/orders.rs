//! Order fulfilment from the shell.
//!
//! # Usage
//!
//! ```bash
//! ajebo-cli orders complete <order-id>
//! ```

use std::sync::Arc;

use ajeborush_core::OrderId;
use ajeborush_storefront::services::Fulfillment;

use super::{CliError, connect};

/// Mark an order completed. Completing an already completed order reports
/// its original fulfilment time.
///
/// # Errors
///
/// Returns an error if the order doesn't exist, was cancelled, or the store
/// is unreachable.
pub async fn complete(id: &str) -> Result<(), CliError> {
    let store = connect().await?;
    let fulfillment = Fulfillment::new(Arc::new(store));

    let order = fulfillment.complete_order(&OrderId::new(id)).await?;

    tracing::info!(
        order = %order.display_id(),
        status = %order.status,
        fulfilled_at = ?order.fulfilled_at,
        "Order completed"
    );
    Ok(())
}
