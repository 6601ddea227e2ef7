// MySQL implementation of BudgetRepository
//
// Implements:
// - Create budget with chapters, items and version 1 (transactional)
// - Replace draft content under an optimistic version check (transactional)
// - Conditional status updates
// - Read budget tree, paginated list, versions, generated project

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use super::budget_repository::{BudgetRepository, ListBudgets};
use crate::core::{AppError, Result};
use crate::modules::budgets::models::{
    Breakdown, Budget, BudgetHeader, BudgetStatus, BudgetSummary, BudgetVersion, CascadeRates,
    Chapter, GeneratedProject, LineItem, StoredBudget,
};

/// Repository for budget database operations
pub struct MySqlBudgetRepository {
    pool: MySqlPool,
}

impl MySqlBudgetRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, MySql>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))
    }

    async fn commit(tx: Transaction<'static, MySql>) -> Result<()> {
        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))
    }

    async fn status_of(&self, id: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT status FROM budgets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch budget status: {}", e)))
    }
}

#[async_trait]
impl BudgetRepository for MySqlBudgetRepository {
    async fn create(&self, budget: &Budget) -> Result<()> {
        let mut tx = self.begin().await?;
        let breakdown = budget.breakdown().for_storage();
        let rates = budget.rates();
        let header = budget.header();

        sqlx::query(
            r#"
            INSERT INTO budgets (
                id, code, client, title, description, status,
                general_expenses_pct, industrial_benefit_pct, discount_pct, tax_pct,
                subtotal, general_expenses, with_expenses, industrial_benefit, with_benefit,
                discount, base_before_tax, tax_amount, total,
                version, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&budget.id)
        .bind(&budget.code)
        .bind(&header.client)
        .bind(&header.title)
        .bind(&header.description)
        .bind(budget.status().as_str())
        .bind(rates.general_expenses_pct)
        .bind(rates.industrial_benefit_pct)
        .bind(rates.discount_pct)
        .bind(rates.tax_pct)
        .bind(breakdown.subtotal)
        .bind(breakdown.general_expenses)
        .bind(breakdown.with_expenses)
        .bind(breakdown.industrial_benefit)
        .bind(breakdown.with_benefit)
        .bind(breakdown.discount)
        .bind(breakdown.base_before_tax)
        .bind(breakdown.tax_amount)
        .bind(breakdown.total)
        .bind(budget.version)
        .bind(&budget.created_by)
        .bind(budget.created_at)
        .bind(budget.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::validation(format!(
                        "Budget with code '{}' already exists",
                        budget.code
                    ));
                }
            }
            AppError::Internal(format!("Failed to create budget: {}", e))
        })?;

        insert_tree(&mut tx, budget).await?;
        insert_version(&mut tx, budget, &budget.created_by).await?;

        Self::commit(tx).await?;

        tracing::debug!(budget_id = %budget.id, code = %budget.code, "Budget inserted");
        Ok(())
    }

    async fn save_content(
        &self,
        budget: &Budget,
        expected_version: i32,
        changed_by: &str,
    ) -> Result<()> {
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, (String, i32)>(
            "SELECT status, version FROM budgets WHERE id = ? FOR UPDATE",
        )
        .bind(&budget.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to lock budget: {}", e)))?;

        let Some((status, version)) = current else {
            return Err(AppError::not_found(format!(
                "Budget with id '{}' not found",
                budget.id
            )));
        };

        if status != BudgetStatus::Draft.as_str() {
            return Err(AppError::conflict(format!(
                "Budget '{}' is {} and can no longer be edited",
                budget.code, status
            )));
        }

        if version != expected_version {
            return Err(AppError::conflict(format!(
                "Budget '{}' was modified concurrently (expected version {}, found {})",
                budget.code, expected_version, version
            )));
        }

        let breakdown = budget.breakdown().for_storage();
        let rates = budget.rates();
        let header = budget.header();

        sqlx::query(
            r#"
            UPDATE budgets SET
                client = ?, title = ?, description = ?,
                general_expenses_pct = ?, industrial_benefit_pct = ?, discount_pct = ?, tax_pct = ?,
                subtotal = ?, general_expenses = ?, with_expenses = ?, industrial_benefit = ?,
                with_benefit = ?, discount = ?, base_before_tax = ?, tax_amount = ?, total = ?,
                version = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&header.client)
        .bind(&header.title)
        .bind(&header.description)
        .bind(rates.general_expenses_pct)
        .bind(rates.industrial_benefit_pct)
        .bind(rates.discount_pct)
        .bind(rates.tax_pct)
        .bind(breakdown.subtotal)
        .bind(breakdown.general_expenses)
        .bind(breakdown.with_expenses)
        .bind(breakdown.industrial_benefit)
        .bind(breakdown.with_benefit)
        .bind(breakdown.discount)
        .bind(breakdown.base_before_tax)
        .bind(breakdown.tax_amount)
        .bind(breakdown.total)
        .bind(budget.version)
        .bind(budget.updated_at)
        .bind(&budget.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update budget: {}", e)))?;

        // Items go with their chapters (ON DELETE CASCADE)
        sqlx::query("DELETE FROM budget_chapters WHERE budget_id = ?")
            .bind(&budget.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to clear chapters: {}", e)))?;

        insert_tree(&mut tx, budget).await?;
        insert_version(&mut tx, budget, changed_by).await?;

        Self::commit(tx).await?;

        tracing::debug!(
            budget_id = %budget.id,
            version = budget.version,
            "Budget content saved"
        );
        Ok(())
    }

    async fn update_status(&self, id: &str, from: BudgetStatus, to: BudgetStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE budgets
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update budget status: {}", e)))?;

        if result.rows_affected() == 0 {
            return match self.status_of(id).await? {
                None => Err(AppError::not_found(format!(
                    "Budget with id '{}' not found",
                    id
                ))),
                Some(current) => Err(AppError::conflict(format!(
                    "Budget status changed concurrently: expected {}, found {}",
                    from, current
                ))),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Budget>> {
        let budget_row = sqlx::query_as::<_, BudgetRow>(
            r#"
            SELECT
                id, code, client, title, description, status,
                general_expenses_pct, industrial_benefit_pct, discount_pct, tax_pct,
                subtotal, general_expenses, with_expenses, industrial_benefit, with_benefit,
                discount, base_before_tax, tax_amount, total,
                version, created_by, created_at, updated_at
            FROM budgets
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch budget: {}", e)))?;

        let Some(budget_row) = budget_row else {
            return Ok(None);
        };

        let chapter_rows = sqlx::query_as::<_, ChapterRow>(
            r#"
            SELECT id, code, name
            FROM budget_chapters
            WHERE budget_id = ?
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch chapters: {}", e)))?;

        let item_rows = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT i.id, i.chapter_id, i.code, i.description, i.unit, i.quantity, i.unit_price
            FROM budget_items i
            JOIN budget_chapters c ON c.id = i.chapter_id
            WHERE c.budget_id = ?
            ORDER BY c.position, i.position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch line items: {}", e)))?;

        Ok(Some(budget_row.into_budget(chapter_rows, item_rows)?))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM budgets WHERE code = ?")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to check budget code: {}", e)))?;

        Ok(count > 0)
    }

    async fn list(&self, query: ListBudgets) -> Result<Vec<BudgetSummary>> {
        let status = query.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, code, client, title, status, subtotal, total, version, updated_at
            FROM budgets
            WHERE (? IS NULL OR status = ?)
            ORDER BY updated_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(status)
        .bind(status)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to list budgets: {}", e)))?;

        rows.into_iter().map(SummaryRow::into_summary).collect()
    }

    async fn list_versions(&self, budget_id: &str) -> Result<Vec<BudgetVersion>> {
        let rows = sqlx::query_as::<_, VersionRow>(
            r#"
            SELECT budget_id, version, total, snapshot, created_by, created_at
            FROM budget_versions
            WHERE budget_id = ?
            ORDER BY version
            "#,
        )
        .bind(budget_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to list budget versions: {}", e)))?;

        rows.into_iter().map(VersionRow::into_version).collect()
    }

    async fn find_generated_project(&self, budget_id: &str) -> Result<Option<GeneratedProject>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, budget_id, name, created_at
            FROM projects
            WHERE budget_id = ?
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(budget_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch generated project: {}", e)))?;

        Ok(row.map(|r| GeneratedProject {
            id: r.id,
            budget_id: r.budget_id,
            name: r.name,
            created_at: r.created_at,
        }))
    }
}

/// Insert every chapter and item of a budget, preserving their order
async fn insert_tree(tx: &mut Transaction<'static, MySql>, budget: &Budget) -> Result<()> {
    for (chapter_pos, chapter) in budget.chapters().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO budget_chapters (id, budget_id, position, code, name, subtotal)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chapter.id)
        .bind(&budget.id)
        .bind(chapter_pos as i32)
        .bind(&chapter.code)
        .bind(&chapter.name)
        .bind(chapter.subtotal())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create chapter: {}", e)))?;

        for (item_pos, item) in chapter.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO budget_items (
                    id, chapter_id, position, code, description, unit,
                    quantity, unit_price, amount
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&chapter.id)
            .bind(item_pos as i32)
            .bind(&item.code)
            .bind(&item.description)
            .bind(&item.unit)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.amount())
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create line item: {}", e)))?;
        }
    }

    Ok(())
}

async fn insert_version(
    tx: &mut Transaction<'static, MySql>,
    budget: &Budget,
    created_by: &str,
) -> Result<()> {
    let snapshot = serde_json::to_string(budget)?;

    sqlx::query(
        r#"
        INSERT INTO budget_versions (budget_id, version, total, snapshot, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&budget.id)
    .bind(budget.version)
    .bind(budget.breakdown().for_storage().total)
    .bind(snapshot)
    .bind(created_by)
    .bind(budget.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to record budget version: {}", e)))?;

    Ok(())
}

fn parse_status(raw: &str) -> Result<BudgetStatus> {
    BudgetStatus::from_str(raw)
        .map_err(|e| AppError::Internal(format!("Invalid status in database: {}", e)))
}

// Helper structs for database mapping

#[derive(Debug, FromRow)]
struct BudgetRow {
    id: String,
    code: String,
    client: String,
    title: String,
    description: Option<String>,
    status: String,
    general_expenses_pct: Decimal,
    industrial_benefit_pct: Decimal,
    discount_pct: Decimal,
    tax_pct: Decimal,
    subtotal: Decimal,
    general_expenses: Decimal,
    with_expenses: Decimal,
    industrial_benefit: Decimal,
    with_benefit: Decimal,
    discount: Decimal,
    base_before_tax: Decimal,
    tax_amount: Decimal,
    total: Decimal,
    version: i32,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BudgetRow {
    fn into_budget(
        self,
        chapter_rows: Vec<ChapterRow>,
        item_rows: Vec<LineItemRow>,
    ) -> Result<Budget> {
        let mut items_by_chapter: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in item_rows {
            let chapter_id = row.chapter_id.clone();
            items_by_chapter
                .entry(chapter_id)
                .or_default()
                .push(row.into_line_item()?);
        }

        let chapters = chapter_rows
            .into_iter()
            .map(|row| {
                let items = items_by_chapter.remove(&row.id).unwrap_or_default();
                Chapter::restore(row.id, row.code, row.name, items)
            })
            .collect();

        Ok(Budget::restore(StoredBudget {
            status: parse_status(&self.status)?,
            id: self.id,
            code: self.code,
            header: BudgetHeader {
                client: self.client,
                title: self.title,
                description: self.description,
            },
            rates: CascadeRates::new(
                self.general_expenses_pct,
                self.industrial_benefit_pct,
                self.discount_pct,
                self.tax_pct,
            ),
            chapters,
            breakdown: Breakdown {
                subtotal: self.subtotal,
                general_expenses: self.general_expenses,
                with_expenses: self.with_expenses,
                industrial_benefit: self.industrial_benefit,
                with_benefit: self.with_benefit,
                discount: self.discount,
                base_before_tax: self.base_before_tax,
                tax_amount: self.tax_amount,
                total: self.total,
            },
            version: self.version,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(Debug, FromRow)]
struct ChapterRow {
    id: String,
    code: String,
    name: String,
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: String,
    chapter_id: String,
    code: String,
    description: String,
    unit: String,
    quantity: Decimal,
    unit_price: Decimal,
}

impl LineItemRow {
    fn into_line_item(self) -> Result<LineItem> {
        LineItem::restore(
            self.id,
            self.code,
            self.description,
            self.unit,
            self.quantity,
            self.unit_price,
        )
        .map_err(|e| AppError::Internal(format!("Invalid line item in database: {}", e)))
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: String,
    code: String,
    client: String,
    title: String,
    status: String,
    subtotal: Decimal,
    total: Decimal,
    version: i32,
    updated_at: DateTime<Utc>,
}

impl SummaryRow {
    fn into_summary(self) -> Result<BudgetSummary> {
        Ok(BudgetSummary {
            status: parse_status(&self.status)?,
            id: self.id,
            code: self.code,
            client: self.client,
            title: self.title,
            subtotal: self.subtotal,
            total: self.total,
            version: self.version,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct VersionRow {
    budget_id: String,
    version: i32,
    total: Decimal,
    snapshot: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl VersionRow {
    fn into_version(self) -> Result<BudgetVersion> {
        let snapshot = serde_json::from_str(&self.snapshot)
            .map_err(|e| AppError::Internal(format!("Invalid version snapshot: {}", e)))?;

        Ok(BudgetVersion {
            budget_id: self.budget_id,
            version: self.version,
            total: self.total,
            snapshot,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: String,
    budget_id: String,
    name: String,
    created_at: DateTime<Utc>,
}
