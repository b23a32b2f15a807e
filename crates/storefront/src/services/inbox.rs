//! Contact inbox.

use std::sync::Arc;

use ajeborush_core::{ContactForm, ContactMessage, MessageId};
use tracing::instrument;

use super::ServiceError;
use crate::store::{self, Direction, DocumentStore, Query, WriteMode, collections};

#[derive(Clone)]
pub struct Inbox {
    store: Arc<dyn DocumentStore>,
}

impl Inbox {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Store a contact form message.
    ///
    /// # Errors
    ///
    /// `ServiceError::Validation` for blank fields or a bad email.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: ContactForm) -> Result<ContactMessage, ServiceError> {
        let created_at = self.store.server_timestamp().await?;
        let message = form
            .into_message(MessageId::generate(), created_at)
            .map_err(ServiceError::Validation)?;
        store::put_as(
            self.store.as_ref(),
            collections::CONTACT_MESSAGES,
            message.id.as_str(),
            &message,
            WriteMode::Replace,
        )
        .await?;
        tracing::info!(message_id = %message.id, "contact message received");
        Ok(message)
    }

    /// All messages, newest first.
    ///
    /// # Errors
    ///
    /// `ServiceError::Store` on store failure.
    pub async fn list(&self) -> Result<Vec<ContactMessage>, ServiceError> {
        let query = Query::all().order_by("createdAt", Direction::Descending);
        Ok(store::query_as(self.store.as_ref(), collections::CONTACT_MESSAGES, &query).await?)
    }

    /// Delete a message. Deleting a missing message succeeds.
    ///
    /// # Errors
    ///
    /// `ServiceError::Store` on store failure.
    pub async fn delete(&self, id: &MessageId) -> Result<(), ServiceError> {
        self.store
            .delete(collections::CONTACT_MESSAGES, id.as_str())
            .await?;
        Ok(())
    }
}
