//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Per-user cart lines, locking and cleanup
//! - `checkout` - Cart to order transition
//! - `archive` - Order and custom request history
//! - `fulfillment` - Admin status transitions
//! - `catalog` - Product CRUD
//! - `custom_requests` - Bespoke request submission
//! - `inbox` - Contact messages
//! - `reviews` - One review per customer
//! - `messaging` - Summary hand-off (WhatsApp link or webhook)

pub mod archive;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod custom_requests;
pub mod fulfillment;
pub mod inbox;
pub mod messaging;
pub mod reviews;

use ajeborush_core::ValidationErrors;
use thiserror::Error;

use crate::store::StoreError;

pub use archive::OrderArchive;
pub use cart::{CartError, CartStore, CartSubscription, DecrementOutcome};
pub use catalog::Catalog;
pub use checkout::{Checkout, CheckoutError, CheckoutWarning, PlacedOrder};
pub use custom_requests::{CustomRequests, SubmittedRequest};
pub use fulfillment::{Fulfillment, FulfillmentError};
pub use inbox::Inbox;
pub use messaging::{DeliveryError, Handoff, MessageChannel, Messenger};
pub use reviews::Reviews;

/// Errors shared by the form-backed services (catalog, custom requests,
/// inbox, reviews).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
