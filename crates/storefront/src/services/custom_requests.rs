//! Bespoke custom request submission.

use std::sync::Arc;

use ajeborush_core::{CustomRequest, CustomRequestForm, RequestId};
use serde::Serialize;
use tracing::instrument;

use super::ServiceError;
use super::messaging::{Handoff, Messenger};
use crate::store::{self, DocumentStore, WriteMode, collections};

/// A stored request and how its summary was handed off.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRequest {
    pub request: CustomRequest,
    pub display_id: String,
    pub handoff: Option<Handoff>,
    /// Set when the summary could not be delivered. The request is stored
    /// regardless.
    pub delivery_failure: Option<String>,
}

#[derive(Clone)]
pub struct CustomRequests {
    store: Arc<dyn DocumentStore>,
    messenger: Messenger,
}

impl CustomRequests {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, messenger: Messenger) -> Self {
        Self { store, messenger }
    }

    /// Validate, store as `Unprocessed`, then hand off the summary.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for bad input (nothing written)
    /// - `ServiceError::Store` if the request can't be stored
    #[instrument(skip(self, form), fields(category = %form.category))]
    pub async fn submit(&self, form: CustomRequestForm) -> Result<SubmittedRequest, ServiceError> {
        let valid = form.validate().map_err(ServiceError::Validation)?;
        let created_at = self.store.server_timestamp().await?;
        let request = CustomRequest::submit(RequestId::generate(), valid, created_at);

        store::put_as(
            self.store.as_ref(),
            collections::CUSTOM_REQUESTS,
            request.id.as_str(),
            &request,
            WriteMode::Replace,
        )
        .await?;
        tracing::info!(request_id = %request.id, "custom request stored");

        let (handoff, delivery_failure) = match self.messenger.deliver(&request.summary()).await {
            Ok(handoff) => (Some(handoff), None),
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "custom request summary delivery failed");
                (None, Some(e.to_string()))
            }
        };

        Ok(SubmittedRequest {
            display_id: request.display_id(),
            request,
            handoff,
            delivery_failure,
        })
    }
}
