//! Monetary rounding and precision rules.
//!
//! Line item amounts and chapter subtotals are kept in cents. Cascade
//! breakdowns are computed exactly and only rounded when stored or shown.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of a displayed or billed amount (euro cents)
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for persisted cascade values
pub const STORAGE_SCALE: u32 = 6;

/// Maximum decimal places accepted for quantities and unit prices
pub const INPUT_SCALE: u32 = 4;

/// Rounds an amount to cents, half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an amount to the storage scale used by the breakdown columns
pub fn round_storage(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(STORAGE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Largest quantity or unit price a line item accepts
pub fn max_line_input() -> Decimal {
    Decimal::from(1_000_000_000u64)
}

/// Largest budget subtotal accepted for saving
///
/// With every rate at 100% and no discount the cascade total is eight times
/// the subtotal, which still fits the `DECIMAL(32, 6)` breakdown columns.
pub fn max_budget_subtotal() -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(24), 0)
}

/// Checks that a budget subtotal stays within [`max_budget_subtotal`]
pub fn check_budget_subtotal(subtotal: Decimal) -> Option<String> {
    if subtotal > max_budget_subtotal() {
        return Some(format!(
            "Budget subtotal cannot exceed {}, got: {}",
            max_budget_subtotal(),
            subtotal
        ));
    }

    None
}

/// Number of significant decimal places, ignoring trailing zeros
pub fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}
