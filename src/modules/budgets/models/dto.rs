// Request and response shapes of the budgets API.
//
// Monetary values travel as decimal strings so no precision is lost in JSON.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::breakdown::{Breakdown, CascadeRates};
use super::budget::{Budget, BudgetStatus};
use super::chapter::Chapter;
use super::line_item::{LineItem, LineItemChange};
use crate::core::Result;

/// Request to create or price a line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
    #[serde(default)]
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl LineItemRequest {
    pub fn into_line_item(self) -> Result<LineItem> {
        LineItem::new(
            self.code,
            self.description,
            self.unit,
            self.quantity,
            self.unit_price,
        )
    }
}

/// Partial update of a line item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLineItemRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

impl From<UpdateLineItemRequest> for LineItemChange {
    fn from(request: UpdateLineItemRequest) -> Self {
        LineItemChange {
            code: request.code,
            description: request.description,
            unit: request.unit,
            quantity: request.quantity,
            unit_price: request.unit_price,
        }
    }
}

/// Request to create a chapter with its items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
}

impl ChapterRequest {
    pub fn into_chapter(self) -> Result<Chapter> {
        let mut chapter = Chapter::new(self.code, self.name);
        for item in self.items {
            chapter.add_item(item.into_line_item()?);
        }
        Ok(chapter)
    }
}

/// Build chapters from requests, failing on the first invalid item
pub fn build_chapters(requests: Vec<ChapterRequest>) -> Result<Vec<Chapter>> {
    requests
        .into_iter()
        .map(ChapterRequest::into_chapter)
        .collect()
}

/// Rates as sent by clients; omitted rates default to zero
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RatesRequest {
    #[serde(default)]
    pub general_expenses_pct: Decimal,
    #[serde(default)]
    pub industrial_benefit_pct: Decimal,
    #[serde(default)]
    pub discount_pct: Decimal,
    #[serde(default)]
    pub tax_pct: Decimal,
}

impl From<RatesRequest> for CascadeRates {
    fn from(r: RatesRequest) -> Self {
        CascadeRates::new(
            r.general_expenses_pct,
            r.industrial_benefit_pct,
            r.discount_pct,
            r.tax_pct,
        )
    }
}

/// Live recalculation of an unsaved budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub rates: RatesRequest,
    #[serde(default)]
    pub chapters: Vec<ChapterRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBudgetRequest {
    pub code: String,
    pub client: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub rates: RatesRequest,
    #[serde(default)]
    pub chapters: Vec<ChapterRequest>,
}

/// Replaces the whole content of a draft budget; the code is immutable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBudgetRequest {
    pub client: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub rates: RatesRequest,
    #[serde(default)]
    pub chapters: Vec<ChapterRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: BudgetStatus,
}

/// Breakdown with exact and display values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownResponse {
    pub exact: Breakdown,
    pub rounded: Breakdown,
}

impl From<&Breakdown> for BreakdownResponse {
    fn from(breakdown: &Breakdown) -> Self {
        Self {
            exact: *breakdown,
            rounded: breakdown.rounded(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemResponse {
    pub id: String,
    pub code: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.clone(),
            code: item.code.clone(),
            description: item.description.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount: item.amount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterResponse {
    pub id: String,
    pub code: String,
    pub name: String,
    pub subtotal: Decimal,
    pub items: Vec<LineItemResponse>,
}

impl From<&Chapter> for ChapterResponse {
    fn from(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id.clone(),
            code: chapter.code.clone(),
            name: chapter.name.clone(),
            subtotal: chapter.subtotal(),
            items: chapter.items().iter().map(LineItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub chapters: Vec<ChapterResponse>,
    pub breakdown: BreakdownResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetResponse {
    pub id: String,
    pub code: String,
    pub client: String,
    pub title: String,
    pub description: Option<String>,
    pub status: BudgetStatus,
    pub is_editable: bool,
    pub rates: CascadeRates,
    pub chapters: Vec<ChapterResponse>,
    pub breakdown: BreakdownResponse,
    pub version: i32,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Budget> for BudgetResponse {
    fn from(budget: &Budget) -> Self {
        let header = budget.header();
        Self {
            id: budget.id.clone(),
            code: budget.code.clone(),
            client: header.client.clone(),
            title: header.title.clone(),
            description: header.description.clone(),
            status: budget.status(),
            is_editable: budget.is_editable(),
            rates: *budget.rates(),
            chapters: budget.chapters().iter().map(ChapterResponse::from).collect(),
            breakdown: BreakdownResponse::from(budget.breakdown()),
            version: budget.version,
            created_by: budget.created_by.clone(),
            created_at: budget.created_at.to_rfc3339(),
            updated_at: budget.updated_at.to_rfc3339(),
        }
    }
}

/// Row of the budget list view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub id: String,
    pub code: String,
    pub client: String,
    pub title: String,
    pub status: BudgetStatus,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<&Budget> for BudgetSummary {
    fn from(budget: &Budget) -> Self {
        Self {
            id: budget.id.clone(),
            code: budget.code.clone(),
            client: budget.header().client.clone(),
            title: budget.header().title.clone(),
            status: budget.status(),
            subtotal: budget.breakdown().subtotal,
            total: budget.breakdown().total,
            version: budget.version,
            updated_at: budget.updated_at,
        }
    }
}

/// Snapshot of a budget's content at a given version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetVersion {
    pub budget_id: String,
    pub version: i32,
    pub total: Decimal,
    pub snapshot: serde_json::Value,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Project created downstream once a budget is approved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProject {
    pub id: String,
    pub budget_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
