//! Collection names.

use ajeborush_core::UserId;

pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const CUSTOM_REQUESTS: &str = "customRequests";
pub const CONTACT_MESSAGES: &str = "contactMessages";
pub const REVIEWS: &str = "reviews";

/// A user's cart lines live in their own sub-collection.
#[must_use]
pub fn cart(user: &UserId) -> String {
    format!("users/{user}/cart")
}
