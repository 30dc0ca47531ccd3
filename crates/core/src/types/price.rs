//! Money helpers and the shipping rule.
//!
//! Amounts are [`Decimal`] in the store currency's standard unit (dollars,
//! not cents) and are always rounded to two places before being persisted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price of one cart/order line, or `None` when it does not fit in a
/// [`Decimal`].
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(round_money)
}

/// Format an amount for display, e.g. `$38.99`.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", round_money(amount))
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingPolicy {
    /// Subtotals at or above this ship free.
    pub free_threshold: Decimal,
    /// Fee charged below the threshold.
    pub flat_fee: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::new(50_00, 2),
            flat_fee: Decimal::new(4_99, 2),
        }
    }
}

impl ShippingPolicy {
    /// Shipping cost for a given subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            round_money(self.flat_fee)
        }
    }
}
