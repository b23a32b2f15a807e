//! Money helpers.
//!
//! All amounts are `rust_decimal::Decimal` in US dollars. Arithmetic stays
//! exact; rounding happens only when a value is shown to a person.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to cents for display.
#[must_use]
pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount as `$1234.50`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", round_for_display(amount))
}
