// LineItem: a single priced unit-of-work row of a chapter.
//
// The amount is always derived from quantity × unit_price and rounded to
// cents. It is never set independently, so a stored item can always be
// re-derived from its inputs.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::core::money::{decimal_places, max_line_input, round_money, INPUT_SCALE};
use crate::core::{AppError, Result};

/// Unit used when the caller leaves it blank ("unidad")
pub const DEFAULT_UNIT: &str = "ud";

/// Suffix appended to the code of a duplicated item
pub const COPY_SUFFIX: &str = "-COPY";

const MAX_CODE_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_UNIT_LEN: usize = 20;

/// Represents a single line item in a chapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    /// Unique identifier for the line item
    pub id: String,

    /// Item code within the chapter (e.g. "01.02")
    pub code: String,

    /// Description of the unit of work
    pub description: String,

    /// Measurement unit (m2, m3, ud, h, ...)
    pub unit: String,

    /// Measured quantity
    pub quantity: Decimal,

    /// Price per unit
    pub unit_price: Decimal,

    /// quantity × unit_price, rounded to cents
    amount: Decimal,
}

/// Changes applied to an existing line item; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct LineItemChange {
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

impl LineItem {
    /// Create a new line item with validation
    ///
    /// # Arguments
    /// * `code` - Item code (max 50 chars, may be empty)
    /// * `description` - Unit-of-work description (max 500 chars)
    /// * `unit` - Measurement unit, defaults to "ud" when blank
    /// * `quantity` - Non-negative, at most 4 decimal places
    /// * `unit_price` - Non-negative, at most 4 decimal places
    pub fn new(
        code: String,
        description: String,
        unit: String,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<Self> {
        Self::restore(
            Uuid::new_v4().to_string(),
            code,
            description,
            unit,
            quantity,
            unit_price,
        )
    }

    /// Rebuild a line item with a known identity (e.g. loaded from storage)
    pub fn restore(
        id: String,
        code: String,
        description: String,
        unit: String,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<Self> {
        Self::validate_code(&code)?;
        Self::validate_description(&description)?;
        let unit = Self::normalize_unit(unit)?;
        Self::validate_amount_input("Quantity", quantity)?;
        Self::validate_amount_input("Unit price", unit_price)?;

        let mut item = Self {
            id,
            code: code.trim().to_string(),
            description: description.trim().to_string(),
            unit,
            quantity,
            unit_price,
            amount: Decimal::ZERO,
        };
        item.calculate_amount();

        Ok(item)
    }

    /// The derived amount (quantity × unit_price, rounded to cents)
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Apply a change and re-derive the amount
    ///
    /// The item is left untouched when any field fails validation.
    pub fn apply(&mut self, change: LineItemChange) -> Result<()> {
        let mut updated = self.clone();

        if let Some(code) = change.code {
            Self::validate_code(&code)?;
            updated.code = code.trim().to_string();
        }
        if let Some(description) = change.description {
            Self::validate_description(&description)?;
            updated.description = description.trim().to_string();
        }
        if let Some(unit) = change.unit {
            updated.unit = Self::normalize_unit(unit)?;
        }
        if let Some(quantity) = change.quantity {
            Self::validate_amount_input("Quantity", quantity)?;
            updated.quantity = quantity;
        }
        if let Some(unit_price) = change.unit_price {
            Self::validate_amount_input("Unit price", unit_price)?;
            updated.unit_price = unit_price;
        }

        updated.calculate_amount();
        *self = updated;

        Ok(())
    }

    /// Clone with a fresh identity and the code suffixed with "-COPY"
    ///
    /// The original code is shortened when needed so the copy stays within
    /// the code length limit.
    pub fn duplicate(&self) -> Self {
        let mut end = self.code.len().min(MAX_CODE_LEN - COPY_SUFFIX.len());
        while !self.code.is_char_boundary(end) {
            end -= 1;
        }

        Self {
            id: Uuid::new_v4().to_string(),
            code: format!("{}{}", &self.code[..end], COPY_SUFFIX),
            ..self.clone()
        }
    }

    fn calculate_amount(&mut self) {
        self.amount = round_money(self.quantity * self.unit_price);
    }

    fn validate_code(code: &str) -> Result<()> {
        if code.trim().len() > MAX_CODE_LEN {
            return Err(AppError::validation(format!(
                "Line item code cannot exceed {} characters",
                MAX_CODE_LEN
            )));
        }

        Ok(())
    }

    fn validate_description(description: &str) -> Result<()> {
        if description.trim().is_empty() {
            return Err(AppError::validation("Line item description cannot be empty"));
        }

        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(AppError::validation(format!(
                "Line item description cannot exceed {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        Ok(())
    }

    fn normalize_unit(unit: String) -> Result<String> {
        let unit = unit.trim();
        if unit.is_empty() {
            return Ok(DEFAULT_UNIT.to_string());
        }

        if unit.len() > MAX_UNIT_LEN {
            return Err(AppError::validation(format!(
                "Line item unit cannot exceed {} characters",
                MAX_UNIT_LEN
            )));
        }

        Ok(unit.to_string())
    }

    fn validate_amount_input(label: &str, value: Decimal) -> Result<()> {
        if value < Decimal::ZERO {
            return Err(AppError::validation(format!(
                "{} must be non-negative, got: {}",
                label, value
            )));
        }

        if value > max_line_input() {
            return Err(AppError::validation(format!(
                "{} cannot exceed {}, got: {}",
                label,
                max_line_input(),
                value
            )));
        }

        if decimal_places(value) > INPUT_SCALE {
            return Err(AppError::validation(format!(
                "{} cannot have more than {} decimal places",
                label, INPUT_SCALE
            )));
        }

        Ok(())
    }
}
