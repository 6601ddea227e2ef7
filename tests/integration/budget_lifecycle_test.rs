// Budget status lifecycle
//
// Draft → InReview → Approved | Rejected → Closed, with review decisions
// reserved to managers, content frozen outside Draft and the downstream
// project polled after approval.

#[path = "../helpers/mod.rs"]
mod helpers;

use rust_decimal_macros::dec;

use helpers::*;
use obrabudget::core::AppError;
use obrabudget::modules::budgets::models::{BudgetResponse, BudgetStatus};

async fn draft(ctx: &TestContext, code: &str) -> BudgetResponse {
    ctx.service
        .create_budget(create_request(code), &estimator())
        .await
        .unwrap()
}

async fn approved(ctx: &TestContext, code: &str) -> BudgetResponse {
    let budget = draft(ctx, code).await;
    ctx.service
        .change_status(&budget.id, BudgetStatus::InReview, &estimator())
        .await
        .unwrap();
    ctx.service
        .change_status(&budget.id, BudgetStatus::Approved, &manager())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_approval_path() {
    let ctx = test_context();
    let budget = draft(&ctx, "P-LIFE").await;

    let in_review = ctx
        .service
        .change_status(&budget.id, BudgetStatus::InReview, &estimator())
        .await
        .unwrap();
    assert_eq!(in_review.status, BudgetStatus::InReview);
    assert!(!in_review.is_editable);

    let approved = ctx
        .service
        .change_status(&budget.id, BudgetStatus::Approved, &manager())
        .await
        .unwrap();
    assert_eq!(approved.status, BudgetStatus::Approved);

    let closed = ctx
        .service
        .change_status(&budget.id, BudgetStatus::Closed, &estimator())
        .await
        .unwrap();
    assert_eq!(closed.status, BudgetStatus::Closed);

    // Status changes do not create content versions
    assert_eq!(closed.version, 1);
    assert_eq!(ctx.repo.version_count(&budget.id), 1);
}

#[tokio::test]
async fn test_rejection_path() {
    let ctx = test_context();
    let budget = draft(&ctx, "P-REJ").await;
    ctx.service
        .change_status(&budget.id, BudgetStatus::InReview, &estimator())
        .await
        .unwrap();

    let rejected = ctx
        .service
        .change_status(&budget.id, BudgetStatus::Rejected, &manager())
        .await
        .unwrap();
    assert_eq!(rejected.status, BudgetStatus::Rejected);

    let closed = ctx
        .service
        .change_status(&budget.id, BudgetStatus::Closed, &manager())
        .await
        .unwrap();
    assert_eq!(closed.status, BudgetStatus::Closed);
}

#[tokio::test]
async fn test_estimator_cannot_decide_review() {
    let ctx = test_context();
    let budget = draft(&ctx, "P-ROLE").await;
    ctx.service
        .change_status(&budget.id, BudgetStatus::InReview, &estimator())
        .await
        .unwrap();

    for decision in [BudgetStatus::Approved, BudgetStatus::Rejected] {
        let result = ctx
            .service
            .change_status(&budget.id, decision, &estimator())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    let current = ctx.service.get_budget(&budget.id).await.unwrap();
    assert_eq!(current.status, BudgetStatus::InReview);
}

#[tokio::test]
async fn test_invalid_transitions_conflict() {
    let ctx = test_context();
    let budget = draft(&ctx, "P-SKIP").await;

    for next in [BudgetStatus::Approved, BudgetStatus::Closed, BudgetStatus::Draft] {
        let result = ctx.service.change_status(&budget.id, next, &manager()).await;
        assert!(
            matches!(result, Err(AppError::Conflict(_))),
            "draft → {} should conflict",
            next
        );
    }

    let closed = approved(&ctx, "P-DONE").await;
    ctx.service
        .change_status(&closed.id, BudgetStatus::Closed, &manager())
        .await
        .unwrap();
    let result = ctx
        .service
        .change_status(&closed.id, BudgetStatus::InReview, &manager())
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_content_is_frozen_outside_draft() {
    let ctx = test_context();
    let budget = draft(&ctx, "P-FROZEN").await;
    let chapter_id = budget.chapters[0].id.clone();
    ctx.service
        .change_status(&budget.id, BudgetStatus::InReview, &estimator())
        .await
        .unwrap();

    let result = ctx
        .service
        .add_item(
            &budget.id,
            &chapter_id,
            item_request("01.02", dec!(1), dec!(1)),
            &estimator(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let result = ctx
        .service
        .update_budget(
            &budget.id,
            update_request(
                vec![chapter_request("01", vec![])],
                standard_rates(),
            ),
            &manager(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    assert_eq!(ctx.repo.version_count(&budget.id), 1);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let ctx = test_context();
    draft(&ctx, "P-A").await;
    draft(&ctx, "P-B").await;
    approved(&ctx, "P-C").await;

    let all = ctx.service.list_budgets(50, 0, None).await.unwrap();
    assert_eq!(all.len(), 3);
    // Newest change first
    assert_eq!(all[0].code, "P-C");

    let drafts = ctx
        .service
        .list_budgets(50, 0, Some(BudgetStatus::Draft))
        .await
        .unwrap();
    assert_eq!(drafts.len(), 2);
    assert!(drafts.iter().all(|b| b.status == BudgetStatus::Draft));

    let page = ctx.service.list_budgets(1, 1, None).await.unwrap();
    assert_eq!(page.len(), 1);

    // Out-of-range paging is clamped rather than rejected
    let clamped = ctx.service.list_budgets(0, -5, None).await.unwrap();
    assert_eq!(clamped.len(), 1);
    assert_eq!(clamped[0].code, "P-C");
}

#[tokio::test]
async fn test_project_only_for_approved_budgets() {
    let ctx = test_context();
    let budget = draft(&ctx, "P-NOPROJ").await;

    let result = ctx.service.generated_project(&budget.id, false).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(ctx.repo.project_lookups(), 0);
}

#[tokio::test]
async fn test_project_lookup_without_wait_checks_once() {
    let ctx = test_context();
    let budget = approved(&ctx, "P-ONCE").await;
    ctx.repo.create_project_after(&budget.id, 2);

    let first = ctx.service.generated_project(&budget.id, false).await.unwrap();
    assert!(first.is_none());
    assert_eq!(ctx.repo.project_lookups(), 1);

    let second = ctx.service.generated_project(&budget.id, false).await.unwrap();
    assert_eq!(second.unwrap().budget_id, budget.id);
}

#[tokio::test]
async fn test_project_wait_polls_until_found() {
    let ctx = test_context();
    let budget = approved(&ctx, "P-WAIT").await;
    ctx.repo.create_project_after(&budget.id, 3);

    let project = ctx
        .service
        .generated_project(&budget.id, true)
        .await
        .unwrap()
        .expect("project should appear on the third lookup");

    assert_eq!(project.budget_id, budget.id);
    assert_eq!(ctx.repo.project_lookups(), 3);
}

#[tokio::test]
async fn test_project_wait_gives_up_after_attempts() {
    let ctx = test_context();
    let budget = approved(&ctx, "P-GIVEUP").await;

    let project = ctx.service.generated_project(&budget.id, true).await.unwrap();

    assert!(project.is_none());
    assert_eq!(ctx.repo.project_lookups(), fast_polling().attempts);
}
