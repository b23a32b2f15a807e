//! Cart lines, totals and the decrement-to-zero confirmation gate.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, ProductType};

/// Key of a cart line: the product id, or `"{productId}-{variant}"` when a
/// size or portion was chosen.
///
/// Adding the same product with the same variant always lands on the same
/// key, which is what makes repeated adds merge into one line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    /// Build the key for a product and optional variant label.
    #[must_use]
    pub fn for_item(item_id: &ProductId, variant_key: Option<&str>) -> Self {
        match variant_key {
            Some(variant) => Self(format!("{item_id}-{variant}")),
            None => Self(item_id.as_str().to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LineKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for LineKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// One product (optionally at one size or portion) staged in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: LineKey,
    pub item_id: ProductId,
    #[serde(default)]
    pub variant_key: Option<String>,
    pub name: String,
    /// Resolved when the line was created; never recomputed.
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_ref: String,
    pub quantity: u32,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of `unit_price * quantity` over all lines. Zero for an empty cart.
#[must_use]
pub fn compute_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

/// Total number of units across all lines, shown on the cart badge.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity)).sum()
}

/// What a single decrement on a line should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementPlan {
    /// Write the new, still positive, quantity.
    SetQuantity(u32),
    /// The line is at one unit; removal needs explicit confirmation.
    ConfirmRemoval,
}

/// Plan a decrement on a line currently holding `quantity` units.
#[must_use]
pub const fn plan_decrement(quantity: u32) -> DecrementPlan {
    if quantity > 1 {
        DecrementPlan::SetQuantity(quantity - 1)
    } else {
        DecrementPlan::ConfirmRemoval
    }
}

/// State of the decrement gate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    /// Waiting for the customer to confirm removing this line.
    PendingConfirmation(CartLine),
}

/// Mutation the caller should perform after driving the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// Persist a decremented quantity.
    SetQuantity { key: LineKey, quantity: u32 },
    /// Show the removal prompt; nothing to write yet.
    AwaitConfirmation,
    /// Delete the line.
    Remove(LineKey),
    /// Nothing to do.
    None,
}

/// Client-side state machine guarding decrement-to-zero.
///
/// Quantity never reaches zero through a decrement: at one unit the gate
/// asks for confirmation, and only a confirm produces a removal. While a
/// confirmation is pending further decrement requests are ignored.
#[derive(Debug, Clone, Default)]
pub struct DecrementGate {
    state: GateState,
}

impl DecrementGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &GateState {
        &self.state
    }

    /// Customer pressed "-" on `line`.
    pub fn request(&mut self, line: &CartLine) -> GateAction {
        if matches!(self.state, GateState::PendingConfirmation(_)) {
            return GateAction::None;
        }
        match plan_decrement(line.quantity) {
            DecrementPlan::SetQuantity(quantity) => GateAction::SetQuantity {
                key: line.id.clone(),
                quantity,
            },
            DecrementPlan::ConfirmRemoval => {
                self.state = GateState::PendingConfirmation(line.clone());
                GateAction::AwaitConfirmation
            }
        }
    }

    /// Customer confirmed the removal prompt.
    pub fn confirm(&mut self) -> GateAction {
        match std::mem::take(&mut self.state) {
            GateState::PendingConfirmation(line) => GateAction::Remove(line.id),
            GateState::Idle => GateAction::None,
        }
    }

    /// Customer dismissed the removal prompt. The line is left untouched.
    pub fn cancel(&mut self) -> GateAction {
        self.state = GateState::Idle;
        GateAction::None
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn line(item: &str, variant: Option<&str>, price: Decimal, quantity: u32) -> CartLine {
        let item_id = ProductId::new(item);
        CartLine {
            id: LineKey::for_item(&item_id, variant),
            item_id,
            variant_key: variant.map(str::to_owned),
            name: item.to_owned(),
            unit_price: price,
            image_ref: String::new(),
            quantity,
            product_type: ProductType::Fashion,
            added_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
