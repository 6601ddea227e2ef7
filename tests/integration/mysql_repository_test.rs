// MySQL Budget Repository Tests
//
// These need a live database; run with
//   TEST_DATABASE_URL=mysql://... cargo test --test mysql_repository_test -- --ignored

#[path = "../helpers/mod.rs"]
mod helpers;

use rust_decimal_macros::dec;

use helpers::*;
use obrabudget::core::AppError;
use obrabudget::modules::budgets::models::{
    build_chapters, Budget, BudgetHeader, BudgetStatus, LineItem,
};
use obrabudget::modules::budgets::repositories::{
    BudgetRepository, ListBudgets, MySqlBudgetRepository,
};

fn new_budget(code: &str) -> Budget {
    let request = create_request(code);
    Budget::draft(
        request.code,
        BudgetHeader {
            client: request.client,
            title: request.title,
            description: request.description,
        },
        request.rates.into(),
        build_chapters(request.chapters).unwrap(),
        estimator().id,
    )
}

async fn repository() -> (MySqlBudgetRepository, sqlx::MySqlPool) {
    let pool = create_test_pool().await;
    (MySqlBudgetRepository::new(pool.clone()), pool)
}

/// A line item reusing an existing primary key, so its insert fails
fn clashing_item(id: &str) -> LineItem {
    LineItem::restore(
        id.to_string(),
        "99.01".to_string(),
        "Partida repetida".to_string(),
        "m2".to_string(),
        dec!(3),
        dec!(7),
    )
    .unwrap()
}

async fn count_for_budget(pool: &sqlx::MySqlPool, table: &str, budget_id: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE budget_id = ?", table);
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(budget_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_create_and_find_round_trip() {
    let (repo, _pool) = repository().await;
    let budget = new_budget(&unique_code());

    repo.create(&budget).await.unwrap();
    let found = repo.find_by_id(&budget.id).await.unwrap().unwrap();

    assert_eq!(found.code, budget.code);
    assert_eq!(found.status(), BudgetStatus::Draft);
    assert_eq!(found.version, 1);
    assert_eq!(found.chapters().len(), 1);
    assert_eq!(found.chapters()[0].items().len(), 1);
    assert_eq!(found.subtotal(), dec!(1000));
    assert_eq!(found.breakdown().total, dec!(1449.338));
    assert!(!found.has_drifted());
    assert!(repo.exists_by_code(&budget.code).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_duplicate_code_is_rejected() {
    let (repo, _pool) = repository().await;
    let code = unique_code();
    repo.create(&new_budget(&code)).await.unwrap();

    let result = repo.create(&new_budget(&code)).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_save_content_checks_version() {
    let (repo, _pool) = repository().await;
    let mut budget = new_budget(&unique_code());
    repo.create(&budget).await.unwrap();

    let chapter_id = budget.chapters()[0].id.clone();
    budget
        .add_item(
            &chapter_id,
            item_request("01.02", dec!(2), dec!(50))
                .into_line_item()
                .unwrap(),
        )
        .unwrap();
    budget.bump_version();
    repo.save_content(&budget, 1, "op-estimator").await.unwrap();

    // A second writer still holding version 1 loses
    let result = repo.save_content(&budget, 1, "op-other").await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let found = repo.find_by_id(&budget.id).await.unwrap().unwrap();
    assert_eq!(found.version, 2);
    assert_eq!(found.subtotal(), dec!(1100));

    let versions = repo.list_versions(&budget.id).await.unwrap();
    assert_eq!(
        versions.iter().map(|v| v.version).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(versions[1].created_by, "op-estimator");
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_update_status_is_conditional() {
    let (repo, _pool) = repository().await;
    let budget = new_budget(&unique_code());
    repo.create(&budget).await.unwrap();

    repo.update_status(&budget.id, BudgetStatus::Draft, BudgetStatus::InReview)
        .await
        .unwrap();

    let stale = repo
        .update_status(&budget.id, BudgetStatus::Draft, BudgetStatus::InReview)
        .await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));

    let missing = repo
        .update_status("no-such-budget", BudgetStatus::Draft, BudgetStatus::InReview)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    // Content is frozen once the budget left draft
    let result = repo.save_content(&budget, 1, "op-estimator").await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_list_filters_by_status() {
    let (repo, _pool) = repository().await;
    let budget = new_budget(&unique_code());
    repo.create(&budget).await.unwrap();
    repo.update_status(&budget.id, BudgetStatus::Draft, BudgetStatus::InReview)
        .await
        .unwrap();

    let in_review = repo
        .list(ListBudgets {
            limit: 100,
            offset: 0,
            status: Some(BudgetStatus::InReview),
        })
        .await
        .unwrap();

    assert!(in_review.iter().any(|b| b.id == budget.id));
    assert!(in_review
        .iter()
        .all(|b| b.status == BudgetStatus::InReview));
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_find_generated_project() {
    let (repo, pool) = repository().await;
    let budget = new_budget(&unique_code());
    repo.create(&budget).await.unwrap();

    assert!(repo
        .find_generated_project(&budget.id)
        .await
        .unwrap()
        .is_none());

    insert_project(&pool, &budget.id, "Reforma nave 3").await;

    let project = repo
        .find_generated_project(&budget.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.budget_id, budget.id);
    assert_eq!(project.name, "Reforma nave 3");
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_failed_create_leaves_nothing_behind() {
    let (repo, pool) = repository().await;
    let mut budget = new_budget(&unique_code());
    let chapter_id = budget.chapters()[0].id.clone();
    let first_item_id = budget.chapters()[0].items()[0].id.clone();
    budget
        .add_item(&chapter_id, clashing_item(&first_item_id))
        .unwrap();

    // Budget and chapter rows go in before the second item fails
    let result = repo.create(&budget).await;
    assert!(matches!(result, Err(AppError::Internal(_))));

    assert!(repo.find_by_id(&budget.id).await.unwrap().is_none());
    assert!(!repo.exists_by_code(&budget.code).await.unwrap());
    assert_eq!(count_for_budget(&pool, "budget_chapters", &budget.id).await, 0);
    assert_eq!(count_for_budget(&pool, "budget_versions", &budget.id).await, 0);

    let items = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM budget_items WHERE chapter_id = ?")
        .bind(&chapter_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(items, 0);
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_failed_save_keeps_previous_version() {
    let (repo, pool) = repository().await;
    let other = new_budget(&unique_code());
    repo.create(&other).await.unwrap();
    let mut budget = new_budget(&unique_code());
    repo.create(&budget).await.unwrap();

    let chapter_id = budget.chapters()[0].id.clone();
    let original_item_id = budget.chapters()[0].items()[0].id.clone();
    let taken_id = other.chapters()[0].items()[0].id.clone();
    budget
        .add_item(&chapter_id, clashing_item(&taken_id))
        .unwrap();
    budget.bump_version();

    // Old chapters are deleted inside the transaction before the reinsert fails
    let result = repo.save_content(&budget, 1, "op-estimator").await;
    assert!(matches!(result, Err(AppError::Internal(_))));

    let found = repo.find_by_id(&budget.id).await.unwrap().unwrap();
    assert_eq!(found.version, 1);
    assert_eq!(found.chapters().len(), 1);
    assert_eq!(found.chapters()[0].id, chapter_id);
    let items = found.chapters()[0].items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, original_item_id);
    assert_eq!(found.subtotal(), dec!(1000));
    assert_eq!(found.breakdown().total, dec!(1449.338));
    assert_eq!(count_for_budget(&pool, "budget_versions", &budget.id).await, 1);

    // The budget it collided with is untouched as well
    let untouched = repo.find_by_id(&other.id).await.unwrap().unwrap();
    assert_eq!(untouched.chapters()[0].items().len(), 1);
}

#[tokio::test]
#[ignore] // Requires MySQL connection
async fn test_widest_accepted_values_are_stored() {
    let (repo, _pool) = repository().await;
    let mut budget = new_budget(&unique_code());
    let chapter_id = budget.chapters()[0].id.clone();
    let widest = LineItem::new(
        "01.02".to_string(),
        "Partida máxima".to_string(),
        "u".repeat(20),
        obrabudget::core::money::max_line_input(),
        obrabudget::core::money::max_line_input(),
    )
    .unwrap();
    budget.add_item(&chapter_id, widest.clone()).unwrap();

    repo.create(&budget).await.unwrap();

    let found = repo.find_by_id(&budget.id).await.unwrap().unwrap();
    let stored = &found.chapters()[0].items()[1];
    assert_eq!(stored.unit, widest.unit);
    assert_eq!(stored.amount(), widest.amount());
    assert_eq!(found.breakdown().total, budget.breakdown().for_storage().total);
    assert!(!found.has_drifted());
}
