use rust_decimal::Decimal;

use crate::core::percentage::apply_percentage;
use super::breakdown::{Breakdown, CascadeRates};

/// CascadeCalculator turns a budget subtotal and its rates into a breakdown
///
/// Each step's base is the running total of the previous step, so general
/// expenses and industrial benefit compound. The calculation is pure and
/// accepts any rate, including negative or >100 values.
pub struct CascadeCalculator;

impl CascadeCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Apply general expenses → industrial benefit → discount → tax
    pub fn calculate(&self, subtotal: Decimal, rates: &CascadeRates) -> Breakdown {
        let general_expenses = apply_percentage(subtotal, rates.general_expenses_pct);
        let with_expenses = subtotal + general_expenses;

        let industrial_benefit = apply_percentage(with_expenses, rates.industrial_benefit_pct);
        let with_benefit = with_expenses + industrial_benefit;

        let discount = apply_percentage(with_benefit, rates.discount_pct);
        let base_before_tax = with_benefit - discount;

        let tax_amount = apply_percentage(base_before_tax, rates.tax_pct);
        let total = base_before_tax + tax_amount;

        Breakdown {
            subtotal,
            general_expenses,
            with_expenses,
            industrial_benefit,
            with_benefit,
            discount,
            base_before_tax,
            tax_amount,
            total,
        }
    }
}

impl Default for CascadeCalculator {
    fn default() -> Self {
        Self::new()
    }
}
