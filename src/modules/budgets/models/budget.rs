// Budget: the aggregate root of chapters, line items and cascade rates.
//
// The breakdown is recomputed forward from the chapter subtotals after every
// mutation. A budget restored from storage keeps its stored breakdown so the
// caller can detect drift against a fresh forward replay.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::breakdown::{Breakdown, CascadeRates};
use super::cascade_calculator::CascadeCalculator;
use super::chapter::Chapter;
use super::line_item::{LineItem, LineItemChange};
use crate::core::money::check_budget_subtotal;
use crate::core::{AppError, Result};

const MAX_CODE_LEN: usize = 50;
const MAX_CLIENT_LEN: usize = 255;
const MAX_TITLE_LEN: usize = 255;

/// Budget status lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Being drafted; the only editable state
    #[default]
    Draft,

    /// Submitted for review
    InReview,

    /// Accepted; an external trigger creates the downstream project
    Approved,

    /// Turned down during review
    Rejected,

    /// Archived after approval or rejection
    Closed,
}

impl BudgetStatus {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: BudgetStatus) -> bool {
        matches!(
            (self, next),
            (BudgetStatus::Draft, BudgetStatus::InReview)
                | (BudgetStatus::InReview, BudgetStatus::Approved)
                | (BudgetStatus::InReview, BudgetStatus::Rejected)
                | (BudgetStatus::Approved, BudgetStatus::Closed)
                | (BudgetStatus::Rejected, BudgetStatus::Closed)
        )
    }

    /// Approving and rejecting are review decisions
    pub fn is_review_decision(self) -> bool {
        matches!(self, BudgetStatus::Approved | BudgetStatus::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetStatus::Draft => "draft",
            BudgetStatus::InReview => "in_review",
            BudgetStatus::Approved => "approved",
            BudgetStatus::Rejected => "rejected",
            BudgetStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BudgetStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BudgetStatus::Draft),
            "in_review" => Ok(BudgetStatus::InReview),
            "approved" => Ok(BudgetStatus::Approved),
            "rejected" => Ok(BudgetStatus::Rejected),
            "closed" => Ok(BudgetStatus::Closed),
            _ => Err(format!("Invalid budget status: {}", s)),
        }
    }
}

/// Descriptive fields of a budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetHeader {
    pub client: String,
    pub title: String,
    pub description: Option<String>,
}

/// All persisted fields of a budget, as read back from storage
#[derive(Debug, Clone)]
pub struct StoredBudget {
    pub id: String,
    pub code: String,
    pub header: BudgetHeader,
    pub status: BudgetStatus,
    pub rates: CascadeRates,
    pub chapters: Vec<Chapter>,
    pub breakdown: Breakdown,
    pub version: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a construction budget
#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: String,
    pub code: String,
    #[serde(flatten)]
    header: BudgetHeader,
    status: BudgetStatus,
    rates: CascadeRates,
    chapters: Vec<Chapter>,
    breakdown: Breakdown,
    /// Content version, incremented by every saved edit
    pub version: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Start a new draft budget
    pub fn draft(
        code: String,
        header: BudgetHeader,
        rates: CascadeRates,
        chapters: Vec<Chapter>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        let mut budget = Self {
            id: Uuid::new_v4().to_string(),
            code: code.trim().to_string(),
            header: Self::trim_header(header),
            status: BudgetStatus::Draft,
            rates,
            chapters,
            breakdown: Breakdown::default(),
            version: 1,
            created_by,
            created_at: now,
            updated_at: now,
        };
        budget.recalculate();
        budget
    }

    /// Rebuild a budget from storage, keeping the stored breakdown as-is
    pub fn restore(stored: StoredBudget) -> Self {
        Self {
            id: stored.id,
            code: stored.code,
            header: stored.header,
            status: stored.status,
            rates: stored.rates,
            chapters: stored.chapters,
            breakdown: stored.breakdown,
            version: stored.version,
            created_by: stored.created_by,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    pub fn header(&self) -> &BudgetHeader {
        &self.header
    }

    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    pub fn rates(&self) -> &CascadeRates {
        &self.rates
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Sum of the chapter subtotals
    pub fn subtotal(&self) -> Decimal {
        self.chapters.iter().map(Chapter::subtotal).sum()
    }

    /// The current breakdown (stored one for a freshly restored budget)
    pub fn breakdown(&self) -> &Breakdown {
        &self.breakdown
    }

    /// Replay the cascade forward from the current chapters and rates
    pub fn replayed_breakdown(&self) -> Breakdown {
        CascadeCalculator::new().calculate(self.subtotal(), &self.rates)
    }

    /// Whether the held breakdown disagrees with a forward replay at storage scale
    pub fn has_drifted(&self) -> bool {
        self.breakdown.for_storage() != self.replayed_breakdown().for_storage()
    }

    /// Content may only change while the budget is a draft
    pub fn is_editable(&self) -> bool {
        self.status == BudgetStatus::Draft
    }

    pub fn ensure_editable(&self) -> Result<()> {
        if !self.is_editable() {
            return Err(AppError::conflict(format!(
                "Budget '{}' is {} and can no longer be edited",
                self.code, self.status
            )));
        }
        Ok(())
    }

    pub fn set_header(&mut self, header: BudgetHeader) {
        self.header = Self::trim_header(header);
        self.touch();
    }

    pub fn set_rates(&mut self, rates: CascadeRates) {
        self.rates = rates;
        self.recalculate();
    }

    pub fn replace_chapters(&mut self, chapters: Vec<Chapter>) {
        self.chapters = chapters;
        self.recalculate();
    }

    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
        self.recalculate();
    }

    pub fn remove_chapter(&mut self, chapter_id: &str) -> Result<Chapter> {
        let index = self
            .chapters
            .iter()
            .position(|c| c.id == chapter_id)
            .ok_or_else(|| Self::chapter_not_found(chapter_id))?;
        let removed = self.chapters.remove(index);
        self.recalculate();
        Ok(removed)
    }

    pub fn add_item(&mut self, chapter_id: &str, item: LineItem) -> Result<LineItem> {
        let added = item.clone();
        self.chapter_mut(chapter_id)?.add_item(item);
        self.recalculate();
        Ok(added)
    }

    pub fn update_item(
        &mut self,
        chapter_id: &str,
        item_id: &str,
        change: LineItemChange,
    ) -> Result<LineItem> {
        let updated = self
            .chapter_mut(chapter_id)?
            .update_item(item_id, change)?
            .clone();
        self.recalculate();
        Ok(updated)
    }

    pub fn remove_item(&mut self, chapter_id: &str, item_id: &str) -> Result<LineItem> {
        let removed = self.chapter_mut(chapter_id)?.remove_item(item_id)?;
        self.recalculate();
        Ok(removed)
    }

    pub fn duplicate_item(&mut self, chapter_id: &str, item_id: &str) -> Result<LineItem> {
        let copy = self
            .chapter_mut(chapter_id)?
            .duplicate_item(item_id)?
            .clone();
        self.recalculate();
        Ok(copy)
    }

    /// Move to `next` if the lifecycle allows it
    pub fn transition(&mut self, next: BudgetStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Invalid status transition from {} to {}",
                self.status, next
            )));
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    /// Every reason this budget cannot be saved, in display order
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.code.is_empty() {
            errors.push("Budget code is required".to_string());
        } else if self.code.len() > MAX_CODE_LEN {
            errors.push(format!(
                "Budget code cannot exceed {} characters",
                MAX_CODE_LEN
            ));
        }

        if self.header.client.is_empty() {
            errors.push("Client is required".to_string());
        } else if self.header.client.len() > MAX_CLIENT_LEN {
            errors.push(format!("Client cannot exceed {} characters", MAX_CLIENT_LEN));
        }

        if self.header.title.len() > MAX_TITLE_LEN {
            errors.push(format!("Title cannot exceed {} characters", MAX_TITLE_LEN));
        }

        if self.chapters.is_empty() {
            errors.push("Budget must have at least one chapter".to_string());
        }

        for (position, chapter) in self.chapters.iter().enumerate() {
            errors.extend(chapter.validation_errors(position));
        }

        errors.extend(check_budget_subtotal(self.subtotal()));
        errors.extend(self.rates.validation_errors());

        errors
    }

    /// Fail with every validation message at once
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(errors))
        }
    }

    /// Mark the content as saved under the next version number
    pub fn bump_version(&mut self) {
        self.version += 1;
        self.touch();
    }

    fn chapter_mut(&mut self, chapter_id: &str) -> Result<&mut Chapter> {
        self.chapters
            .iter_mut()
            .find(|c| c.id == chapter_id)
            .ok_or_else(|| Self::chapter_not_found(chapter_id))
    }

    fn chapter_not_found(chapter_id: &str) -> AppError {
        AppError::not_found(format!("Chapter '{}' not found", chapter_id))
    }

    fn recalculate(&mut self) {
        self.breakdown = self.replayed_breakdown();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn trim_header(header: BudgetHeader) -> BudgetHeader {
        BudgetHeader {
            client: header.client.trim().to_string(),
            title: header.title.trim().to_string(),
            description: header
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}
