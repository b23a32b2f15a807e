//! Customer reviews. Each user has at most one, keyed by their user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;
use crate::validation::ValidationErrors;

/// Author name used when the reviewer leaves it blank.
pub const DEFAULT_AUTHOR_NAME: &str = "Elite Member";

/// Title shown under every review author.
pub const AUTHOR_TITLE: &str = "Verified Client";

/// A stored review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Same as the author's user id.
    pub id: UserId,
    pub author_name: String,
    pub author_title: String,
    pub review: String,
    pub rating: u8,
    #[serde(default)]
    pub photo_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub review: String,
    pub rating: u8,
    #[serde(default)]
    pub photo_ref: Option<String>,
}

impl ReviewForm {
    /// Turn the form into the stored review for `user`.
    ///
    /// `existing` is the user's current review, if any; its `createdAt` is
    /// kept so edits don't move the review to the top of the list.
    ///
    /// # Errors
    ///
    /// Returns per-field messages for blank text or a rating outside 1-5.
    pub fn into_review(
        self,
        user: UserId,
        existing: Option<&Review>,
        now: DateTime<Utc>,
    ) -> Result<Review, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("review", &self.review, "Please write a review");
        if !(1..=5).contains(&self.rating) {
            errors.add("rating", "Rating must be between 1 and 5");
        }
        errors.finish(())?;

        let author_name = match self.author_name.trim() {
            "" => DEFAULT_AUTHOR_NAME.to_owned(),
            name => name.to_owned(),
        };
        let photo_ref = self
            .photo_ref
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());

        Ok(Review {
            id: user,
            author_name,
            author_title: AUTHOR_TITLE.to_owned(),
            review: self.review.trim().to_owned(),
            rating: self.rating,
            photo_ref,
            created_at: existing.map_or(now, |r| r.created_at),
            updated_at: now,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_defaults() {
        let review = ReviewForm {
            author_name: "  ".to_owned(),
            review: "Best jollof in Texas".to_owned(),
            rating: 5,
            photo_ref: Some(String::new()),
        }
        .into_review(UserId::new("u1"), None, DateTime::<Utc>::UNIX_EPOCH)
        .unwrap();
        assert_eq!(review.author_name, DEFAULT_AUTHOR_NAME);
        assert_eq!(review.author_title, AUTHOR_TITLE);
        assert_eq!(review.photo_ref, None);
        assert_eq!(review.created_at, review.updated_at);
    }

    #[test]
    fn test_update_keeps_created_at() {
        let first_at = DateTime::<Utc>::UNIX_EPOCH;
        let form = ReviewForm {
            author_name: "Kemi".to_owned(),
            review: "Lovely fit".to_owned(),
            rating: 4,
            photo_ref: None,
        };
        let first = form
            .clone()
            .into_review(UserId::new("u1"), None, first_at)
            .unwrap();
        let later = first_at + Duration::days(3);
        let second = form
            .into_review(UserId::new("u1"), Some(&first), later)
            .unwrap();
        assert_eq!(second.created_at, first_at);
        assert_eq!(second.updated_at, later);
    }

    #[test]
    fn test_rating_bounds() {
        for rating in [0, 6] {
            let errors = ReviewForm {
                review: "ok".to_owned(),
                rating,
                ..ReviewForm::default()
            }
            .into_review(UserId::new("u1"), None, DateTime::<Utc>::UNIX_EPOCH)
            .unwrap_err();
            assert_eq!(errors.get("rating"), Some("Rating must be between 1 and 5"));
        }
    }
}
