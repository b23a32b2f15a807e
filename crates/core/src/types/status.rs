//! Status enums and their transitions.
//!
//! Order and custom-request statuses only ever move forward. Transitions are
//! expressed as "set to X": applying one to a record already in X reports
//! [`Transition::AlreadyApplied`] instead of flipping anything.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Trays of food, priced per portion.
    Catering,
    /// Clothing, optionally sized.
    Fashion,
}

impl ProductType {
    /// Lowercase label used in documents and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catering => "catering",
            Self::Fashion => "fashion",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catering" => Ok(Self::Catering),
            "fashion" => Ok(Self::Fashion),
            _ => Err(format!("invalid product type: {s}")),
        }
    }
}

/// Order lifecycle status.
///
/// `Cancelled` is terminal and reserved for manual/external use; no
/// transition in this crate reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Lowercase label as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Apply the `pending -> completed` transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPermitted`] for a cancelled order.
    pub fn complete(self) -> Result<Transition, TransitionError> {
        match self {
            Self::Pending => Ok(Transition::Applied),
            Self::Completed => Ok(Transition::AlreadyApplied),
            Self::Cancelled => Err(TransitionError::NotPermitted {
                from: self.as_str(),
                to: Self::Completed.as_str(),
            }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom request status.
///
/// Stored with capitalised labels. A missing or null status is read as
/// `Unprocessed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RequestStatus {
    #[default]
    Unprocessed,
    Processed,
}

impl RequestStatus {
    /// Label as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unprocessed => "Unprocessed",
            Self::Processed => "Processed",
        }
    }

    /// Apply the `Unprocessed -> Processed` transition.
    #[must_use]
    pub const fn process(self) -> Transition {
        match self {
            Self::Unprocessed => Transition::Applied,
            Self::Processed => Transition::AlreadyApplied,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permitted status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The record moved into the target state.
    Applied,
    /// The record was already in the target state; nothing to write.
    AlreadyApplied,
}

/// A status transition that is not allowed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move from {from} to {to}")]
    NotPermitted {
        from: &'static str,
        to: &'static str,
    },
}

/// Deserialize `null` as the type's default value.
///
/// Use together with `#[serde(default)]` so missing fields are covered too.
///
/// # Errors
///
/// Propagates errors from the inner deserializer.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_complete_transitions() {
        assert_eq!(OrderStatus::Pending.complete(), Ok(Transition::Applied));
        assert_eq!(
            OrderStatus::Completed.complete(),
            Ok(Transition::AlreadyApplied)
        );
        assert!(OrderStatus::Cancelled.complete().is_err());
    }

    #[test]
    fn test_request_process_transitions() {
        assert_eq!(RequestStatus::Unprocessed.process(), Transition::Applied);
        assert_eq!(RequestStatus::Processed.process(), Transition::AlreadyApplied);
    }

    #[test]
    fn test_status_labels_match_storage() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&RequestStatus::Processed).unwrap(),
            "\"Processed\""
        );
        assert_eq!(
            serde_json::to_string(&ProductType::Catering).unwrap(),
            "\"catering\""
        );
    }

    #[test]
    fn test_null_request_status_reads_as_unprocessed() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default, deserialize_with = "null_as_default")]
            status: RequestStatus,
        }

        let missing: Wrapper = serde_json::from_str("{}").unwrap();
        let null: Wrapper = serde_json::from_str(r#"{"status":null}"#).unwrap();
        assert_eq!(missing.status, RequestStatus::Unprocessed);
        assert_eq!(null.status, RequestStatus::Unprocessed);
    }

    #[test]
    fn test_product_type_from_str() {
        assert_eq!("fashion".parse::<ProductType>(), Ok(ProductType::Fashion));
        assert!("shoes".parse::<ProductType>().is_err());
    }
}
