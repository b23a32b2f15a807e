//! Customer reviews, one per user, stored under the user's id.

use std::sync::Arc;

use ajeborush_core::{Review, ReviewForm, UserId};
use tracing::instrument;

use super::ServiceError;
use crate::store::{self, Direction, DocumentStore, Query, WriteMode, collections};

#[derive(Clone)]
pub struct Reviews {
    store: Arc<dyn DocumentStore>,
}

impl Reviews {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All reviews, newest first.
    ///
    /// # Errors
    ///
    /// `ServiceError::Store` on store failure.
    pub async fn list(&self) -> Result<Vec<Review>, ServiceError> {
        let query = Query::all().order_by("createdAt", Direction::Descending);
        Ok(store::query_as(self.store.as_ref(), collections::REVIEWS, &query).await?)
    }

    /// The user's own review, if any.
    ///
    /// # Errors
    ///
    /// `ServiceError::Store` on store failure.
    pub async fn mine(&self, user: &UserId) -> Result<Option<Review>, ServiceError> {
        Ok(store::get_as(self.store.as_ref(), collections::REVIEWS, user.as_str()).await?)
    }

    /// Create or replace the user's review.
    ///
    /// # Errors
    ///
    /// `ServiceError::Validation` for blank text or a rating outside 1-5.
    #[instrument(skip(self, form), fields(user_id = %user))]
    pub async fn upsert(&self, user: &UserId, form: ReviewForm) -> Result<Review, ServiceError> {
        let existing = self.mine(user).await?;
        let now = self.store.server_timestamp().await?;
        let review = form
            .into_review(user.clone(), existing.as_ref(), now)
            .map_err(ServiceError::Validation)?;
        store::put_as(
            self.store.as_ref(),
            collections::REVIEWS,
            user.as_str(),
            &review,
            WriteMode::Replace,
        )
        .await?;
        tracing::info!(rating = review.rating, "review saved");
        Ok(review)
    }

    /// Delete the user's review. Deleting a missing review succeeds.
    ///
    /// # Errors
    ///
    /// `ServiceError::Store` on store failure.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn delete(&self, user: &UserId) -> Result<(), ServiceError> {
        self.store.delete(collections::REVIEWS, user.as_str()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn form(text: &str, rating: u8) -> ReviewForm {
        ReviewForm {
            author_name: String::new(),
            review: text.to_string(),
            rating,
            photo_ref: None,
        }
    }

    #[tokio::test]
    async fn test_one_review_per_user() {
        let reviews = Reviews::new(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");

        let first = reviews.upsert(&user, form("Great", 4)).await.unwrap();
        let second = reviews.upsert(&user, form("Even better", 5)).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        let all = reviews.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].review, "Even better");
        assert_eq!(all[0].author_name, "Elite Member");
    }

    #[tokio::test]
    async fn test_delete_own_review() {
        let reviews = Reviews::new(Arc::new(MemoryStore::new()));
        let user = UserId::new("u1");
        reviews.upsert(&user, form("Great", 4)).await.unwrap();
        reviews.delete(&user).await.unwrap();
        assert!(reviews.mine(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_rating_rejected() {
        let reviews = Reviews::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            reviews.upsert(&UserId::new("u1"), form("Meh", 9)).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
