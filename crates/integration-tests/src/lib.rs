//! Integration tests for AjeboRush.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ajeborush-integration-tests
//! ```
//!
//! Everything runs against the in-memory document store, so no database is
//! needed.
//!
//! # Test Categories
//!
//! - `cart_lifecycle` - Cart lines, price freezing, the decrement gate
//! - `checkout` - Order placement and partial failures
//! - `fulfillment` - Admin transitions and the order archive
//! - `http_api` - Routes through the full router

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use ajeborush_core::{Product, ProductDraft, ProductId, ProductType, ShippingForm};
use ajeborush_storefront::config::StorefrontConfig;
use ajeborush_storefront::state::AppState;
use ajeborush_storefront::store::MemoryStore;
use axum::Router;
use rust_decimal::Decimal;
use secrecy::SecretString;

/// Admin token accepted by [`TestContext`] routers.
pub const ADMIN_TOKEN: &str = "q7Vd2LmZ9xKp4RtW8nYc3HbJ6sFg1EuA";

/// A fresh memory store with the full service stack on top.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let mut config = StorefrontConfig::with_defaults(SecretString::from(ADMIN_TOKEN.to_string()));
        config.cart.retry_pause = Duration::ZERO;

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone()).unwrap();
        Self { store, state }
    }

    /// The full application router.
    #[must_use]
    pub fn router(&self) -> Router {
        ajeborush_storefront::app(self.state.clone())
    }

    /// Store a fashion product under `id`.
    pub async fn fashion(&self, id: &str, name: &str, price: Decimal, sizes: &[&str]) -> Product {
        let draft = ProductDraft {
            price: Some(price),
            sizes: sizes.iter().map(|s| (*s).to_string()).collect(),
            ..draft(name, ProductType::Fashion)
        };
        self.state
            .catalog()
            .put(ProductId::new(id), draft)
            .await
            .unwrap()
    }

    /// Store a catering product with portion prices under `id`.
    pub async fn catering(&self, id: &str, name: &str, full: Decimal, half: Decimal) -> Product {
        let draft = ProductDraft {
            full_price: Some(full),
            half_price: Some(half),
            ..draft(name, ProductType::Catering)
        };
        self.state
            .catalog()
            .put(ProductId::new(id), draft)
            .await
            .unwrap()
    }
}

/// An empty draft of the given type.
#[must_use]
pub fn draft(name: &str, product_type: ProductType) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        description: String::new(),
        image_ref: String::new(),
        product_type,
        price: None,
        original_price: None,
        discounted_price: None,
        full_price: None,
        half_price: None,
        sizes: Vec::new(),
    }
}

/// A shipping form that passes validation.
#[must_use]
pub fn shipping_form() -> ShippingForm {
    ShippingForm {
        name: "Ada Obi".to_string(),
        email: "ada@example.com".to_string(),
        address: "12 Elm Street".to_string(),
        city: "Dallas".to_string(),
        state: "TX".to_string(),
        zip: "75201".to_string(),
    }
}

/// Two-decimal amount from cents.
#[must_use]
pub fn usd(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
