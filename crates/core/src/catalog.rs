//! Catalog products and the variants a customer can pick.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, ProductType};
use crate::validation::ValidationErrors;

/// Catering portion size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Portion {
    Full,
    Half,
}

impl Portion {
    /// Label used in line keys and display names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Half => "Half",
        }
    }
}

impl fmt::Display for Portion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A variant chosen when adding a product to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    /// Fashion size label, e.g. `"M"`.
    Size(String),
    /// Catering portion.
    Portion(Portion),
}

/// A catalog product.
///
/// Which price fields are populated depends on the product type:
/// - fashion: `price`, optionally with `originalPrice`/`discountedPrice`
/// - catering: `fullPrice`/`halfPrice`, or a single generic `price`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_ref: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub discounted_price: Option<Decimal>,
    #[serde(default)]
    pub full_price: Option<Decimal>,
    #[serde(default)]
    pub half_price: Option<Decimal>,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from a validated draft.
    #[must_use]
    pub fn from_draft(id: ProductId, draft: ProductDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_owned(),
            description: draft.description,
            image_ref: draft.image_ref,
            product_type: draft.product_type,
            price: draft.price,
            original_price: draft.original_price,
            discounted_price: draft.discounted_price,
            full_price: draft.full_price,
            half_price: draft.half_price,
            sizes: draft.sizes,
            created_at,
        }
    }

    /// Whether the product is sold by portion.
    #[must_use]
    pub const fn has_portion_pricing(&self) -> bool {
        self.full_price.is_some() || self.half_price.is_some()
    }
}

/// Admin input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_ref: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub discounted_price: Option<Decimal>,
    #[serde(default)]
    pub full_price: Option<Decimal>,
    #[serde(default)]
    pub half_price: Option<Decimal>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

impl ProductDraft {
    /// Check the draft can be priced and is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns field-level messages for every problem found.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name, "Product name is required");

        let prices = [
            ("price", self.price),
            ("originalPrice", self.original_price),
            ("discountedPrice", self.discounted_price),
            ("fullPrice", self.full_price),
            ("halfPrice", self.half_price),
        ];
        for (field, value) in prices {
            if value.is_some_and(|p| p.is_sign_negative()) {
                errors.add(field, "Price cannot be negative");
            }
        }

        if let (Some(original), Some(discounted)) = (self.original_price, self.discounted_price)
            && discounted > original
        {
            errors.add(
                "discountedPrice",
                "Discounted price cannot exceed the original price",
            );
        }

        match self.product_type {
            ProductType::Fashion => {
                if self.price.is_none() && self.discounted_price.is_none() {
                    errors.add("price", "A price is required");
                }
                if self.full_price.is_some() || self.half_price.is_some() {
                    errors.add("fullPrice", "Portion prices only apply to catering items");
                }
                if self.sizes.iter().any(|s| s.trim().is_empty()) {
                    errors.add("sizes", "Size labels cannot be blank");
                }
            }
            ProductType::Catering => {
                if self.price.is_none() && self.full_price.is_none() && self.half_price.is_none()
                {
                    errors.add("price", "A full, half or single price is required");
                }
                if !self.sizes.is_empty() {
                    errors.add("sizes", "Sizes only apply to fashion items");
                }
            }
        }

        errors.finish(())
    }
}
