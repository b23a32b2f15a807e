//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::{
    CartStore, Catalog, Checkout, CustomRequests, DeliveryError, Fulfillment, Inbox, Messenger,
    OrderArchive, Reviews,
};
use crate::store::DocumentStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// document store, the services built on it, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
    cart: CartStore,
    checkout: Checkout,
    archive: OrderArchive,
    fulfillment: Fulfillment,
    custom_requests: CustomRequests,
    inbox: Inbox,
    reviews: Reviews,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary hand-off channel can't be built.
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, DeliveryError> {
        let messenger = Messenger::from_config(&config.messaging)?;
        Ok(Self::with_messenger(config, store, messenger))
    }

    /// Create application state with an explicit hand-off channel.
    #[must_use]
    pub fn with_messenger(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        messenger: Messenger,
    ) -> Self {
        let cart = CartStore::new(store.clone(), &config.cart);

        Self {
            inner: Arc::new(AppStateInner {
                catalog: Catalog::new(store.clone()),
                checkout: Checkout::new(store.clone(), cart.clone(), messenger.clone()),
                archive: OrderArchive::new(store.clone()),
                fulfillment: Fulfillment::new(store.clone()),
                custom_requests: CustomRequests::new(store.clone(), messenger),
                inbox: Inbox::new(store.clone()),
                reviews: Reviews::new(store.clone()),
                cart,
                store,
                config,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    #[must_use]
    pub fn archive(&self) -> &OrderArchive {
        &self.inner.archive
    }

    #[must_use]
    pub fn fulfillment(&self) -> &Fulfillment {
        &self.inner.fulfillment
    }

    #[must_use]
    pub fn custom_requests(&self) -> &CustomRequests {
        &self.inner.custom_requests
    }

    #[must_use]
    pub fn inbox(&self) -> &Inbox {
        &self.inner.inbox
    }

    #[must_use]
    pub fn reviews(&self) -> &Reviews {
        &self.inner.reviews
    }
}
