use std::sync::Arc;

use crate::core::{AppError, Operator, Result};
use crate::modules::budgets::models::{
    build_chapters, BreakdownResponse, Budget, BudgetHeader, BudgetResponse, BudgetStatus,
    BudgetSummary, BudgetVersion, CascadeCalculator, CascadeRates, ChapterRequest, ChapterResponse,
    CreateBudgetRequest, GeneratedProject, LineItemRequest, PreviewRequest, PreviewResponse,
    UpdateBudgetRequest, UpdateLineItemRequest,
};
use crate::modules::budgets::repositories::{BudgetRepository, ListBudgets};

use super::project_poller::{ProjectPollSettings, ProjectPoller};

/// Largest page the list endpoint will return
pub const MAX_PAGE_SIZE: i64 = 100;

/// Service for budget business logic
pub struct BudgetService {
    repo: Arc<dyn BudgetRepository>,
    calculator: CascadeCalculator,
    poller: ProjectPoller,
}

impl BudgetService {
    pub fn new(repo: Arc<dyn BudgetRepository>, poll_settings: ProjectPollSettings) -> Self {
        Self {
            poller: ProjectPoller::new(repo.clone(), poll_settings),
            calculator: CascadeCalculator::new(),
            repo,
        }
    }

    /// Price an unsaved set of chapters under the given rates
    ///
    /// Nothing is stored; clients call this on every edit to keep a live total.
    pub fn preview(&self, request: PreviewRequest) -> Result<PreviewResponse> {
        let rates = CascadeRates::from(request.rates);
        let errors = rates.validation_errors();
        if !errors.is_empty() {
            return Err(AppError::ValidationFailed(errors));
        }

        let chapters = build_chapters(request.chapters)?;
        let subtotal = chapters.iter().map(|c| c.subtotal()).sum();
        let breakdown = self.calculator.calculate(subtotal, &rates);

        Ok(PreviewResponse {
            chapters: chapters.iter().map(ChapterResponse::from).collect(),
            breakdown: BreakdownResponse::from(&breakdown),
        })
    }

    /// Create a draft budget and store it with its whole tree in one transaction
    pub async fn create_budget(
        &self,
        request: CreateBudgetRequest,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let chapters = build_chapters(request.chapters)?;
        let budget = Budget::draft(
            request.code,
            BudgetHeader {
                client: request.client,
                title: request.title,
                description: request.description,
            },
            request.rates.into(),
            chapters,
            operator.id.clone(),
        );

        budget.validate()?;

        if self.repo.exists_by_code(&budget.code).await? {
            return Err(AppError::validation(format!(
                "Budget with code '{}' already exists",
                budget.code
            )));
        }

        self.repo.create(&budget).await?;

        tracing::info!(
            budget_id = %budget.id,
            code = %budget.code,
            total = %budget.breakdown().total,
            operator = %operator.id,
            "Budget created"
        );

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn get_budget(&self, id: &str) -> Result<BudgetResponse> {
        let budget = self.load(id).await?;
        Ok(BudgetResponse::from(&budget))
    }

    pub async fn list_budgets(
        &self,
        limit: i64,
        offset: i64,
        status: Option<BudgetStatus>,
    ) -> Result<Vec<BudgetSummary>> {
        self.repo
            .list(ListBudgets {
                limit: limit.clamp(1, MAX_PAGE_SIZE),
                offset: offset.max(0),
                status,
            })
            .await
    }

    /// Replace client, title, description, rates and chapters of a draft
    pub async fn update_budget(
        &self,
        id: &str,
        request: UpdateBudgetRequest,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let chapters = build_chapters(request.chapters)?;
        let header = BudgetHeader {
            client: request.client,
            title: request.title,
            description: request.description,
        };
        let rates = CascadeRates::from(request.rates);

        let budget = self
            .edit(id, operator, move |budget| {
                budget.set_header(header);
                budget.set_rates(rates);
                budget.replace_chapters(chapters);
                Ok(())
            })
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn add_chapter(
        &self,
        id: &str,
        request: ChapterRequest,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let chapter = request.into_chapter()?;
        let budget = self
            .edit(id, operator, move |budget| {
                budget.add_chapter(chapter);
                Ok(())
            })
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn remove_chapter(
        &self,
        id: &str,
        chapter_id: &str,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let budget = self
            .edit(id, operator, |budget| budget.remove_chapter(chapter_id).map(|_| ()))
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn add_item(
        &self,
        id: &str,
        chapter_id: &str,
        request: LineItemRequest,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let item = request.into_line_item()?;
        let budget = self
            .edit(id, operator, |budget| budget.add_item(chapter_id, item).map(|_| ()))
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn update_item(
        &self,
        id: &str,
        chapter_id: &str,
        item_id: &str,
        request: UpdateLineItemRequest,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let budget = self
            .edit(id, operator, |budget| {
                budget
                    .update_item(chapter_id, item_id, request.into())
                    .map(|_| ())
            })
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn remove_item(
        &self,
        id: &str,
        chapter_id: &str,
        item_id: &str,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let budget = self
            .edit(id, operator, |budget| {
                budget.remove_item(chapter_id, item_id).map(|_| ())
            })
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn duplicate_item(
        &self,
        id: &str,
        chapter_id: &str,
        item_id: &str,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        let budget = self
            .edit(id, operator, |budget| {
                budget.duplicate_item(chapter_id, item_id).map(|_| ())
            })
            .await?;

        Ok(BudgetResponse::from(&budget))
    }

    /// Move a budget through its lifecycle
    ///
    /// Approving and rejecting are reserved to managers.
    pub async fn change_status(
        &self,
        id: &str,
        next: BudgetStatus,
        operator: &Operator,
    ) -> Result<BudgetResponse> {
        if next.is_review_decision() && !operator.role.can_review() {
            return Err(AppError::forbidden(format!(
                "Only managers can mark a budget as {}",
                next
            )));
        }

        let mut budget = self.load(id).await?;
        let current = budget.status();
        budget.transition(next)?;

        self.repo.update_status(id, current, next).await?;

        tracing::info!(
            budget_id = %budget.id,
            from = %current,
            to = %next,
            operator = %operator.id,
            "Budget status changed"
        );

        Ok(BudgetResponse::from(&budget))
    }

    pub async fn list_versions(&self, id: &str) -> Result<Vec<BudgetVersion>> {
        let budget = self.load(id).await?;
        self.repo.list_versions(&budget.id).await
    }

    /// The project created downstream after approval
    ///
    /// With `wait`, polls until it appears or the attempts run out.
    pub async fn generated_project(
        &self,
        id: &str,
        wait: bool,
    ) -> Result<Option<GeneratedProject>> {
        let budget = self.load(id).await?;

        if !matches!(
            budget.status(),
            BudgetStatus::Approved | BudgetStatus::Closed
        ) {
            return Err(AppError::conflict(format!(
                "Budget '{}' is {}; projects are only generated for approved budgets",
                budget.code,
                budget.status()
            )));
        }

        if wait {
            self.poller.poll(&budget.id).await
        } else {
            self.repo.find_generated_project(&budget.id).await
        }
    }

    /// Fetch a budget, warning when its stored breakdown no longer matches a replay
    async fn load(&self, id: &str) -> Result<Budget> {
        let budget = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Budget with id '{}' not found", id)))?;

        if budget.has_drifted() {
            tracing::warn!(
                budget_id = %budget.id,
                stored_total = %budget.breakdown().total,
                replayed_total = %budget.replayed_breakdown().total,
                "Stored breakdown differs from forward replay"
            );
        }

        Ok(budget)
    }

    /// Load a draft, apply `change`, validate and save it as the next version
    async fn edit<F>(&self, id: &str, operator: &Operator, change: F) -> Result<Budget>
    where
        F: FnOnce(&mut Budget) -> Result<()>,
    {
        let mut budget = self.load(id).await?;
        budget.ensure_editable()?;

        change(&mut budget)?;
        budget.validate()?;

        let expected_version = budget.version;
        budget.bump_version();
        self.repo
            .save_content(&budget, expected_version, &operator.id)
            .await?;

        tracing::info!(
            budget_id = %budget.id,
            version = budget.version,
            total = %budget.breakdown().total,
            operator = %operator.id,
            "Budget content saved"
        );

        Ok(budget)
    }
}
