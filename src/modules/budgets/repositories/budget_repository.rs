use async_trait::async_trait;

use crate::core::Result;
use crate::modules::budgets::models::{
    Budget, BudgetStatus, BudgetSummary, BudgetVersion, GeneratedProject,
};

/// Filters and paging for the budget list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListBudgets {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<BudgetStatus>,
}

/// Storage boundary for budgets and everything hanging off them
///
/// Every write is atomic: the budget row, its chapters, its items and the
/// version snapshot either all land or none do.
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Insert a new budget with its full tree and version 1
    async fn create(&self, budget: &Budget) -> Result<()>;

    /// Replace the content of a draft budget
    ///
    /// `budget.version` must already be the new version; the write only
    /// applies when the stored row is still a draft at `expected_version`.
    async fn save_content(
        &self,
        budget: &Budget,
        expected_version: i32,
        changed_by: &str,
    ) -> Result<()>;

    /// Move a budget from `from` to `to`, failing if it is no longer at `from`
    async fn update_status(&self, id: &str, from: BudgetStatus, to: BudgetStatus) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Budget>>;

    async fn exists_by_code(&self, code: &str) -> Result<bool>;

    /// Newest first
    async fn list(&self, query: ListBudgets) -> Result<Vec<BudgetSummary>>;

    /// Oldest first
    async fn list_versions(&self, budget_id: &str) -> Result<Vec<BudgetVersion>>;

    /// Project created by the external approval trigger, if any yet
    async fn find_generated_project(&self, budget_id: &str) -> Result<Option<GeneratedProject>>;
}
