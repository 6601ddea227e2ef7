use rust_decimal::Decimal;

use crate::core::money::decimal_places;

/// Maximum decimal places accepted for a percentage rate
pub const PERCENTAGE_SCALE: u32 = 2;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Applies a percentage expressed on a 0-100 scale: `base * pct / 100`
///
/// No range checks: negative or >100 rates are applied as given.
pub fn apply_percentage(base: Decimal, pct: Decimal) -> Decimal {
    base * pct / HUNDRED
}

/// Checks that a rate lies in [0, 100] with at most two decimal places
///
/// Returns a human-readable message naming the rate on failure.
pub fn check_percentage(label: &str, pct: Decimal) -> Option<String> {
    if pct < Decimal::ZERO {
        return Some(format!("{} cannot be negative, got: {}", label, pct));
    }

    if pct > HUNDRED {
        return Some(format!("{} cannot exceed 100, got: {}", label, pct));
    }

    if decimal_places(pct) > PERCENTAGE_SCALE {
        return Some(format!(
            "{} cannot have more than {} decimal places",
            label, PERCENTAGE_SCALE
        ));
    }

    None
}
