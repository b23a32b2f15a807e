//! Newtype IDs for type-safe document references.
//!
//! Documents in the store are keyed by opaque strings (auth-provider user
//! ids, generated order ids, product slugs). Use the `define_id!` macro to
//! create wrappers that prevent accidentally mixing IDs from different
//! collections.

use uuid::Uuid;

/// Number of trailing characters shown in a human-facing display id.
pub const DISPLAY_ID_LEN: usize = 8;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Constructors: `new()`, `generate()`
/// - Accessors: `as_str()`, `display_id()`
/// - `From<String>`, `From<&str>`, `AsRef<str>` and `Display`
///
/// # Example
///
/// ```rust
/// # use ajeborush_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("uid-1");
/// let order_id = OrderId::new("uid-1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing document id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random id.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::types::id::generate_raw())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Short upper-case identifier suitable for showing to people.
            #[must_use]
            pub fn display_id(&self) -> String {
                $crate::types::id::display_suffix(&self.0)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard document IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(RequestId);
define_id!(MessageId);

/// Generate a random 32-character lowercase hex id.
#[must_use]
pub fn generate_raw() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Derive the display form of an id: its last [`DISPLAY_ID_LEN`] characters,
/// upper-cased.
///
/// The same input always yields the same output. Display ids are not
/// guaranteed to be unique.
#[must_use]
pub fn display_suffix(id: &str) -> String {
    let len = id.chars().count();
    id.chars()
        .skip(len.saturating_sub(DISPLAY_ID_LEN))
        .collect::<String>()
        .to_uppercase()
}
