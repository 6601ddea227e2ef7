mod breakdown;
mod budget;
mod cascade_calculator;
mod chapter;
mod dto;
mod line_item;

pub use breakdown::{Breakdown, CascadeRates};
pub use budget::{Budget, BudgetHeader, BudgetStatus, StoredBudget};
pub use cascade_calculator::CascadeCalculator;
pub use chapter::Chapter;
pub use dto::{
    build_chapters, BreakdownResponse, BudgetResponse, BudgetSummary, BudgetVersion,
    ChangeStatusRequest, ChapterRequest, ChapterResponse, CreateBudgetRequest, GeneratedProject,
    LineItemRequest, LineItemResponse, PreviewRequest, PreviewResponse, RatesRequest,
    UpdateBudgetRequest, UpdateLineItemRequest,
};
pub use line_item::{LineItem, LineItemChange, COPY_SUFFIX, DEFAULT_UNIT};
