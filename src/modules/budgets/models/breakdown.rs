use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::{round_money, round_storage};
use crate::core::percentage::check_percentage;

/// The four percentage rates of a budget, each on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CascadeRates {
    /// Gastos generales
    pub general_expenses_pct: Decimal,
    /// Beneficio industrial
    pub industrial_benefit_pct: Decimal,
    pub discount_pct: Decimal,
    /// IVA
    pub tax_pct: Decimal,
}

impl CascadeRates {
    pub fn new(
        general_expenses_pct: Decimal,
        industrial_benefit_pct: Decimal,
        discount_pct: Decimal,
        tax_pct: Decimal,
    ) -> Self {
        Self {
            general_expenses_pct,
            industrial_benefit_pct,
            discount_pct,
            tax_pct,
        }
    }

    /// Messages for every rate outside [0, 100] or with more than 2 decimals
    pub fn validation_errors(&self) -> Vec<String> {
        [
            ("General expenses", self.general_expenses_pct),
            ("Industrial benefit", self.industrial_benefit_pct),
            ("Discount", self.discount_pct),
            ("Tax", self.tax_pct),
        ]
        .into_iter()
        .filter_map(|(label, pct)| check_percentage(label, pct))
        .collect()
    }
}

/// Every value produced by the cascade, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Breakdown {
    pub subtotal: Decimal,
    pub general_expenses: Decimal,
    pub with_expenses: Decimal,
    pub industrial_benefit: Decimal,
    pub with_benefit: Decimal,
    pub discount: Decimal,
    pub base_before_tax: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl Breakdown {
    /// All values rounded to cents, for presentation
    pub fn rounded(&self) -> Self {
        self.map(round_money)
    }

    /// All values rounded to the persisted column scale
    pub fn for_storage(&self) -> Self {
        self.map(round_storage)
    }

    fn map(&self, f: impl Fn(Decimal) -> Decimal) -> Self {
        Self {
            subtotal: f(self.subtotal),
            general_expenses: f(self.general_expenses),
            with_expenses: f(self.with_expenses),
            industrial_benefit: f(self.industrial_benefit),
            with_benefit: f(self.with_benefit),
            discount: f(self.discount),
            base_before_tax: f(self.base_before_tax),
            tax_amount: f(self.tax_amount),
            total: f(self.total),
        }
    }
}
