// Chapter: an ordered group of line items ("capítulo").
//
// The subtotal is a cached full re-sum of the current items and is
// recomputed after every mutation, never adjusted incrementally.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::line_item::{LineItem, LineItemChange};
use crate::core::{AppError, Result};

const MAX_CODE_LEN: usize = 50;
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub id: String,
    pub code: String,
    pub name: String,
    items: Vec<LineItem>,
    subtotal: Decimal,
}

impl Chapter {
    pub fn new(code: String, name: String) -> Self {
        Self::restore(Uuid::new_v4().to_string(), code, name, Vec::new())
    }

    /// Rebuild a chapter with a known identity and items
    pub fn restore(id: String, code: String, name: String, items: Vec<LineItem>) -> Self {
        let mut chapter = Self {
            id,
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            items,
            subtotal: Decimal::ZERO,
        };
        chapter.recalculate();
        chapter
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of the current item amounts
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
        self.recalculate();
    }

    /// Update an item in place and re-sum the chapter
    pub fn update_item(&mut self, item_id: &str, change: LineItemChange) -> Result<&LineItem> {
        let index = self.position(item_id)?;
        self.items[index].apply(change)?;
        self.recalculate();
        Ok(&self.items[index])
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<LineItem> {
        let index = self.position(item_id)?;
        let removed = self.items.remove(index);
        self.recalculate();
        Ok(removed)
    }

    /// Insert a copy of an item directly after it and return the copy
    pub fn duplicate_item(&mut self, item_id: &str) -> Result<&LineItem> {
        let index = self.position(item_id)?;
        let copy = self.items[index].duplicate();
        self.items.insert(index + 1, copy);
        self.recalculate();
        Ok(&self.items[index + 1])
    }

    /// Messages describing why this chapter cannot be saved
    pub fn validation_errors(&self, position: usize) -> Vec<String> {
        let mut errors = Vec::new();
        let label = format!("Chapter {}", position + 1);

        if self.code.is_empty() {
            errors.push(format!("{}: code is required", label));
        } else if self.code.len() > MAX_CODE_LEN {
            errors.push(format!(
                "{}: code cannot exceed {} characters",
                label, MAX_CODE_LEN
            ));
        }

        if self.name.is_empty() {
            errors.push(format!("{}: name is required", label));
        } else if self.name.len() > MAX_NAME_LEN {
            errors.push(format!(
                "{}: name cannot exceed {} characters",
                label, MAX_NAME_LEN
            ));
        }

        errors
    }

    fn position(&self, item_id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Line item '{}' not found in chapter '{}'",
                    item_id, self.code
                ))
            })
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().map(LineItem::amount).sum();
    }
}
