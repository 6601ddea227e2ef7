// In-memory BudgetRepository
//
// Mirrors the MySQL repository's observable behaviour: unique codes, draft-only
// content saves under an optimistic version check, conditional status updates,
// breakdowns read back at storage scale and one snapshot per saved version.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use obrabudget::core::{AppError, Result};
use obrabudget::modules::budgets::models::{
    Budget, BudgetStatus, BudgetSummary, BudgetVersion, GeneratedProject, StoredBudget,
};
use obrabudget::modules::budgets::repositories::{BudgetRepository, ListBudgets};

#[derive(Default)]
struct State {
    budgets: HashMap<String, Budget>,
    versions: Vec<BudgetVersion>,
    projects: HashMap<String, GeneratedProject>,
    /// Budgets whose project appears after this many more lookups
    pending_projects: HashMap<String, u32>,
    project_lookups: u32,
}

#[derive(Default)]
pub struct InMemoryBudgetRepository {
    state: Mutex<State>,
}

impl InMemoryBudgetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a budget as-is, bypassing every check
    pub fn insert_raw(&self, budget: Budget) {
        self.state
            .lock()
            .unwrap()
            .budgets
            .insert(budget.id.clone(), budget);
    }

    /// Make the project for `budget_id` show up on the `lookups`-th lookup
    pub fn create_project_after(&self, budget_id: &str, lookups: u32) {
        self.state
            .lock()
            .unwrap()
            .pending_projects
            .insert(budget_id.to_string(), lookups);
    }

    pub fn project_lookups(&self) -> u32 {
        self.state.lock().unwrap().project_lookups
    }

    pub fn version_count(&self, budget_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .versions
            .iter()
            .filter(|v| v.budget_id == budget_id)
            .count()
    }

    fn as_stored(budget: &Budget) -> Budget {
        Budget::restore(StoredBudget {
            id: budget.id.clone(),
            code: budget.code.clone(),
            header: budget.header().clone(),
            status: budget.status(),
            rates: *budget.rates(),
            chapters: budget.chapters().to_vec(),
            breakdown: budget.breakdown().for_storage(),
            version: budget.version,
            created_by: budget.created_by.clone(),
            created_at: budget.created_at,
            updated_at: budget.updated_at,
        })
    }

    fn snapshot(budget: &Budget, created_by: &str) -> Result<BudgetVersion> {
        Ok(BudgetVersion {
            budget_id: budget.id.clone(),
            version: budget.version,
            total: budget.breakdown().for_storage().total,
            snapshot: serde_json::to_value(budget)?,
            created_by: created_by.to_string(),
            created_at: budget.updated_at,
        })
    }
}

#[async_trait]
impl BudgetRepository for InMemoryBudgetRepository {
    async fn create(&self, budget: &Budget) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.budgets.values().any(|b| b.code == budget.code) {
            return Err(AppError::validation(format!(
                "Budget with code '{}' already exists",
                budget.code
            )));
        }

        let version = Self::snapshot(budget, &budget.created_by)?;
        state
            .budgets
            .insert(budget.id.clone(), Self::as_stored(budget));
        state.versions.push(version);
        Ok(())
    }

    async fn save_content(
        &self,
        budget: &Budget,
        expected_version: i32,
        changed_by: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        let current = state
            .budgets
            .get(&budget.id)
            .ok_or_else(|| AppError::not_found(format!("Budget with id '{}' not found", budget.id)))?;

        if current.status() != BudgetStatus::Draft {
            return Err(AppError::conflict(format!(
                "Budget '{}' is {} and can no longer be edited",
                current.code,
                current.status()
            )));
        }

        if current.version != expected_version {
            return Err(AppError::conflict(format!(
                "Budget '{}' was modified concurrently (expected version {}, found {})",
                current.code, expected_version, current.version
            )));
        }

        let version = Self::snapshot(budget, changed_by)?;
        state
            .budgets
            .insert(budget.id.clone(), Self::as_stored(budget));
        state.versions.push(version);
        Ok(())
    }

    async fn update_status(&self, id: &str, from: BudgetStatus, to: BudgetStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        let budget = state
            .budgets
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Budget with id '{}' not found", id)))?;

        if budget.status() != from {
            return Err(AppError::conflict(format!(
                "Budget status changed concurrently: expected {}, found {}",
                from,
                budget.status()
            )));
        }

        budget.transition(to)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Budget>> {
        Ok(self.state.lock().unwrap().budgets.get(id).cloned())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .budgets
            .values()
            .any(|b| b.code == code))
    }

    async fn list(&self, query: ListBudgets) -> Result<Vec<BudgetSummary>> {
        let state = self.state.lock().unwrap();

        let mut budgets: Vec<&Budget> = state
            .budgets
            .values()
            .filter(|b| query.status.map_or(true, |s| b.status() == s))
            .collect();
        budgets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(budgets
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(BudgetSummary::from)
            .collect())
    }

    async fn list_versions(&self, budget_id: &str) -> Result<Vec<BudgetVersion>> {
        let state = self.state.lock().unwrap();

        let mut versions: Vec<BudgetVersion> = state
            .versions
            .iter()
            .filter(|v| v.budget_id == budget_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn find_generated_project(&self, budget_id: &str) -> Result<Option<GeneratedProject>> {
        let mut state = self.state.lock().unwrap();
        state.project_lookups += 1;

        if let Some(remaining) = state.pending_projects.get_mut(budget_id) {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                state.pending_projects.remove(budget_id);
                state.projects.insert(
                    budget_id.to_string(),
                    GeneratedProject {
                        id: Uuid::new_v4().to_string(),
                        budget_id: budget_id.to_string(),
                        name: format!("Project for {}", budget_id),
                        created_at: Utc::now(),
                    },
                );
            }
        }

        Ok(state.projects.get(budget_id).cloned())
    }
}
