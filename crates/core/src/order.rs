//! Orders, shipping form validation and the order summary text.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{self, CartLine};
use crate::types::{Email, OrderId, OrderStatus, ProductId, ProductType, UserId, format_usd};
use crate::validation::ValidationErrors;

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl ShippingAddress {
    /// Single-line form: `"12 Palm Ave, Dallas, TX 75201"`.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }
}

/// Snapshot of a cart line taken when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub item_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub variant_key: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image_ref: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
}

impl OrderLineItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<&CartLine> for OrderLineItem {
    fn from(line: &CartLine) -> Self {
        Self {
            item_id: line.item_id.clone(),
            name: line.name.clone(),
            variant_key: line.variant_key.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            image_ref: line.image_ref.clone(),
            product_type: Some(line.product_type),
        }
    }
}

/// A placed order.
///
/// Everything except `status` and `fulfilledAt` is fixed at creation.
/// `totalAmount` is computed once from the snapshot and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub contact_email: Email,
    pub shipping_address: ShippingAddress,
    pub line_items: Vec<OrderLineItem>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Snapshot `lines` into a new pending order.
    #[must_use]
    pub fn place(
        id: OrderId,
        user_id: UserId,
        shipping: ValidShipping,
        lines: &[CartLine],
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            customer_name: shipping.name,
            contact_email: shipping.email,
            shipping_address: shipping.address,
            line_items: lines.iter().map(OrderLineItem::from).collect(),
            total_amount: cart::compute_total(lines),
            status: OrderStatus::Pending,
            created_at,
            fulfilled_at: None,
        }
    }

    /// Short id shown on the orders page and in the admin panel.
    #[must_use]
    pub fn display_id(&self) -> String {
        self.id.display_id()
    }

    /// Number of units across all line items.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.line_items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Human-readable summary handed to the shop owner.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = String::from("*NEW STUDIO ORDER*\n\n*Client Details:*\n");
        let _ = writeln!(text, "Name: {}", self.customer_name);
        let _ = writeln!(text, "Email: {}", self.contact_email);
        let _ = writeln!(text, "Address: {}", self.shipping_address.one_line());
        let _ = write!(
            text,
            "\n*Order Total:* {}\n\n*Manifest:*\n",
            format_usd(self.total_amount)
        );
        for (index, item) in self.line_items.iter().enumerate() {
            let _ = write!(text, "{}. *{}*", index + 1, item.name);
            if let (Some(ProductType::Fashion), Some(size)) =
                (item.product_type, &item.variant_key)
            {
                let _ = write!(text, " (Size: {size})");
            }
            let _ = writeln!(
                text,
                " - {} unit(s) @ {}",
                item.quantity,
                format_usd(item.unit_price)
            );
        }
        let _ = write!(
            text,
            "\n*Order ID:* {}\n\n_Secured via AjeboRush Checkout_",
            self.display_id()
        );
        text
    }
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

/// A checkout form that passed validation, with values trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidShipping {
    pub name: String,
    pub email: Email,
    pub address: ShippingAddress,
}

impl ShippingForm {
    /// Validate the form before anything is written.
    ///
    /// `cart_is_empty` is checked alongside the fields so one pass reports
    /// every problem.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages shown under each input.
    pub fn validate(&self, cart_is_empty: bool) -> Result<ValidShipping, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require("name", &self.name, "Full name is required");
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
        errors.require("address", &self.address, "Shipping address is required");
        errors.require("city", &self.city, "City is required");
        errors.require("state", &self.state, "State is required");
        errors.require("zip", &self.zip, "ZIP code is required");
        if cart_is_empty {
            errors.add("cart", "Your cart is empty");
        }

        match parsed {
            Some(email) if errors.is_empty() => Ok(ValidShipping {
                name: self.name.trim().to_owned(),
                email,
                address: ShippingAddress {
                    street: self.address.trim().to_owned(),
                    city: self.city.trim().to_owned(),
                    state: self.state.trim().to_owned(),
                    zip: self.zip.trim().to_owned(),
                },
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::fixtures::line;

    fn form() -> ShippingForm {
        ShippingForm {
            name: " Ada Obi ".to_owned(),
            email: "ada@example.com".to_owned(),
            address: "12 Palm Ave".to_owned(),
            city: "Dallas".to_owned(),
            state: "TX".to_owned(),
            zip: "75201".to_owned(),
        }
    }

    #[test]
    fn test_valid_form_is_trimmed() {
        let valid = form().validate(false).unwrap();
        assert_eq!(valid.name, "Ada Obi");
        assert_eq!(valid.email.as_str(), "ada@example.com");
        assert_eq!(valid.address.one_line(), "12 Palm Ave, Dallas, TX 75201");
    }

    #[test]
    fn test_every_field_reports() {
        let errors = ShippingForm::default().validate(true).unwrap_err();
        assert_eq!(errors.get("name"), Some("Full name is required"));
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("address"), Some("Shipping address is required"));
        assert_eq!(errors.get("city"), Some("City is required"));
        assert_eq!(errors.get("state"), Some("State is required"));
        assert_eq!(errors.get("zip"), Some("ZIP code is required"));
        assert_eq!(errors.get("cart"), Some("Your cart is empty"));
    }

    #[test]
    fn test_invalid_email() {
        let mut f = form();
        f.email = "ada@example".to_owned();
        let errors = f.validate(false).unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is invalid"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_empty_cart_blocks_valid_form() {
        let errors = form().validate(true).unwrap_err();
        assert_eq!(errors.get("cart"), Some("Your cart is empty"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_place_snapshots_lines_and_total() {
        let lines = vec![
            line("jollof", Some("Full"), Decimal::new(1000, 2), 2),
            line("puff", None, Decimal::new(550, 2), 1),
        ];
        let order = Order::place(
            OrderId::new("ord-0001abcd"),
            UserId::new("u1"),
            form().validate(false).unwrap(),
            &lines,
            DateTime::<Utc>::UNIX_EPOCH,
        );
        assert_eq!(order.total_amount, Decimal::new(2550, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.unit_count(), 3);
        assert_eq!(order.line_items[0].variant_key.as_deref(), Some("Full"));
        assert_eq!(order.fulfilled_at, None);
        assert_eq!(order.display_id(), "0001ABCD");
    }

    #[test]
    fn test_summary_text() {
        let mut jollof = line("Jollof (Full)", Some("Full"), Decimal::new(1000, 2), 2);
        jollof.product_type = ProductType::Catering;
        let lines = vec![
            jollof,
            line("Wrap Skirt", Some("M"), Decimal::new(200, 2), 1),
            line("Puff", None, Decimal::new(55, 1), 1),
        ];
        let order = Order::place(
            OrderId::new("abcdefgh12345678"),
            UserId::new("u1"),
            form().validate(false).unwrap(),
            &lines,
            DateTime::<Utc>::UNIX_EPOCH,
        );
        let summary = order.summary();
        assert!(summary.starts_with("*NEW STUDIO ORDER*"));
        assert!(summary.contains("Name: Ada Obi\n"));
        assert!(summary.contains("Address: 12 Palm Ave, Dallas, TX 75201\n"));
        assert!(summary.contains("*Order Total:* $27.50"));
        assert!(summary.contains("1. *Jollof (Full)* - 2 unit(s) @ $10.00\n"));
        assert!(summary.contains("2. *Wrap Skirt* (Size: M) - 1 unit(s) @ $2.00\n"));
        assert!(summary.contains("3. *Puff* - 1 unit(s) @ $5.50\n"));
        assert!(summary.contains("*Order ID:* 12345678"));
        assert!(summary.ends_with("_Secured via AjeboRush Checkout_"));
    }

    #[test]
    fn test_order_document_reads_missing_status_as_pending() {
        let json = serde_json::json!({
            "id": "o1",
            "userId": "u1",
            "customerName": "Ada",
            "contactEmail": "ada@example.com",
            "shippingAddress": {"street": "1", "city": "c", "state": "s", "zip": "z"},
            "lineItems": [],
            "totalAmount": "0",
            "createdAt": "2026-01-01T00:00:00Z"
        });
        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.fulfilled_at, None);
    }
}
