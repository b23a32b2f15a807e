//! Contact inbox messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, MessageId};
use crate::validation::ValidationErrors;

/// A message left through the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: MessageId,
    pub name: String,
    pub email: Email,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Raw contact form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Validate and stamp the message.
    ///
    /// # Errors
    ///
    /// Returns per-field messages when a field is blank or the email is
    /// malformed.
    pub fn into_message(
        self,
        id: MessageId,
        created_at: DateTime<Utc>,
    ) -> Result<ContactMessage, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name, "Name is required");
        errors.require("message", &self.message, "Message is required");
        let email = match Email::parse(self.email.trim()) {
            Ok(email) => Some(email),
            Err(_) if self.email.trim().is_empty() => {
                errors.add("email", "Email is required");
                None
            }
            Err(_) => {
                errors.add("email", "Email is invalid");
                None
            }
        };

        match email {
            Some(email) if errors.is_empty() => Ok(ContactMessage {
                id,
                name: self.name.trim().to_owned(),
                email,
                message: self.message.trim().to_owned(),
                created_at,
            }),
            _ => Err(errors),
        }
    }
}
