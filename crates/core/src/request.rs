//! Bespoke custom requests.
//!
//! Custom requests are filed against the requester's email rather than a user
//! id, so they can be looked up for whoever signs in with that address.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, ProductType, RequestId, RequestStatus, null_as_default};
use crate::validation::ValidationErrors;

/// Maximum number of words in a request description.
pub const MAX_DESCRIPTION_WORDS: usize = 150;

/// Maximum number of attachment references per request.
pub const MAX_ATTACHMENTS: usize = 3;

/// A stored custom request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRequest {
    pub id: RequestId,
    pub name: String,
    pub contact_email: Email,
    #[serde(default)]
    pub phone: String,
    pub category: ProductType,
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl CustomRequest {
    /// Build a new `Unprocessed` request from validated input.
    #[must_use]
    pub fn submit(id: RequestId, form: ValidCustomRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: form.name,
            contact_email: form.email,
            phone: form.phone,
            category: form.category,
            description: form.description,
            attachments: form.attachments,
            status: RequestStatus::Unprocessed,
            created_at,
            fulfilled_at: None,
        }
    }

    #[must_use]
    pub fn display_id(&self) -> String {
        self.id.display_id()
    }

    /// Summary handed to the shop owner.
    #[must_use]
    pub fn summary(&self) -> String {
        let rule = "--------------------------";
        let mut text = format!("*AJEBORUSH CUSTOM REQUEST*\n{rule}\n");
        let _ = writeln!(text, "*Name:* {}", self.name);
        let _ = writeln!(text, "*Email:* {}", self.contact_email);
        let _ = writeln!(text, "*Phone:* {}", self.phone);
        let _ = writeln!(
            text,
            "*Category:* {}",
            self.category.as_str().to_uppercase()
        );
        let _ = writeln!(text, "*Description:* {}", self.description);
        let _ = writeln!(text, "*Order ID:* {}", self.id);
        let _ = writeln!(text, "{rule}");
        if self.attachments.is_empty() {
            text.push_str("No attachments.");
        } else {
            let _ = write!(text, "Attachments: {}", self.attachments.join(", "));
        }
        text
    }
}

/// Raw custom request form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRequestForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub category: ProductType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Custom request input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCustomRequest {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub category: ProductType,
    pub description: String,
    pub attachments: Vec<String>,
}

/// Number of whitespace-separated words in `text`.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

impl CustomRequestForm {
    /// # Errors
    ///
    /// Returns per-field messages for missing or oversized input.
    pub fn validate(self) -> Result<ValidCustomRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name, "Name is required");
        errors.require("phone", &self.phone, "Phone number is required");

        let email = self.email.trim();
        let parsed = if email.is_empty() {
            errors.add("email", "Email is required");
            None
        } else if let Ok(email) = Email::parse(email) {
            Some(email)
        } else {
            errors.add("email", "Email is invalid");
            None
        };

        let words = word_count(&self.description);
        if words == 0 {
            errors.add("description", "Please describe your request");
        } else if words > MAX_DESCRIPTION_WORDS {
            errors.add(
                "description",
                format!("Description must be {MAX_DESCRIPTION_WORDS} words or fewer"),
            );
        }

        let attachments: Vec<String> = self
            .attachments
            .iter()
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect();
        if attachments.len() > MAX_ATTACHMENTS {
            errors.add(
                "attachments",
                format!("At most {MAX_ATTACHMENTS} images can be attached"),
            );
        }

        match parsed {
            Some(email) if errors.is_empty() => Ok(ValidCustomRequest {
                name: self.name.trim().to_owned(),
                email,
                phone: self.phone.trim().to_owned(),
                category: self.category,
                description: self.description.trim().to_owned(),
                attachments,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CustomRequestForm {
        CustomRequestForm {
            name: "Tolu".to_owned(),
            email: "tolu@example.com".to_owned(),
            phone: "+1 555 0100".to_owned(),
            category: ProductType::Fashion,
            description: "An agbada in emerald green for a wedding".to_owned(),
            attachments: vec!["https://img.example.com/a.jpg".to_owned()],
        }
    }

    #[test]
    fn test_valid_request() {
        let valid = form().validate().unwrap();
        assert_eq!(valid.email.as_str(), "tolu@example.com");
        assert_eq!(valid.attachments.len(), 1);
    }

    #[test]
    fn test_word_limit() {
        let mut f = form();
        f.description = "word ".repeat(MAX_DESCRIPTION_WORDS);
        assert!(f.clone().validate().is_ok());
        f.description.push_str("extra");
        let errors = f.validate().unwrap_err();
        assert_eq!(
            errors.get("description"),
            Some("Description must be 150 words or fewer")
        );
    }

    #[test]
    fn test_attachment_limit() {
        let mut f = form();
        f.attachments = (0..4).map(|i| format!("ref-{i}")).collect();
        let errors = f.validate().unwrap_err();
        assert!(errors.get("attachments").is_some());
    }

    #[test]
    fn test_missing_fields() {
        let f = CustomRequestForm {
            name: String::new(),
            email: "nope".to_owned(),
            phone: " ".to_owned(),
            category: ProductType::Catering,
            description: String::new(),
            attachments: Vec::new(),
        };
        let errors = f.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some("Email is invalid"));
        assert_eq!(errors.get("phone"), Some("Phone number is required"));
        assert_eq!(
            errors.get("description"),
            Some("Please describe your request")
        );
    }

    #[test]
    fn test_submit_and_summary() {
        let request = CustomRequest::submit(
            RequestId::new("req123"),
            form().validate().unwrap(),
            DateTime::<Utc>::UNIX_EPOCH,
        );
        assert_eq!(request.status, RequestStatus::Unprocessed);
        let summary = request.summary();
        assert!(summary.starts_with("*AJEBORUSH CUSTOM REQUEST*"));
        assert!(summary.contains("*Category:* FASHION\n"));
        assert!(summary.contains("*Order ID:* req123\n"));
    }

    #[test]
    fn test_null_status_reads_unprocessed() {
        let json = serde_json::json!({
            "id": "r1",
            "name": "Tolu",
            "contactEmail": "tolu@example.com",
            "category": "catering",
            "description": "Small chops for forty",
            "status": null,
            "createdAt": "2026-02-01T10:00:00Z"
        });
        let request: CustomRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.status, RequestStatus::Unprocessed);
    }
}
