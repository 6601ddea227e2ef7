use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::core::Operator;
use crate::modules::budgets::models::{
    BudgetStatus, ChangeStatusRequest, ChapterRequest, CreateBudgetRequest, LineItemRequest,
    PreviewRequest, UpdateBudgetRequest, UpdateLineItemRequest,
};
use crate::modules::budgets::services::BudgetService;

/// Query parameters for listing budgets
#[derive(Debug, Deserialize)]
pub struct ListBudgetsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<BudgetStatus>,
}

fn default_limit() -> i64 {
    50
}

/// Query parameters for the generated project lookup
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub wait: bool,
}

/// Path of a chapter inside a budget
#[derive(Debug, Deserialize)]
pub struct ChapterPath {
    pub id: String,
    pub chapter_id: String,
}

/// Path of a line item inside a chapter
#[derive(Debug, Deserialize)]
pub struct ItemPath {
    pub id: String,
    pub chapter_id: String,
    pub item_id: String,
}

/// Recalculate an unsaved budget
/// POST /budgets/preview
pub async fn preview_budget(
    service: web::Data<Arc<BudgetService>>,
    _operator: Operator,
    request: web::Json<PreviewRequest>,
) -> Result<HttpResponse, AppError> {
    let preview = service.preview(request.into_inner())?;
    Ok(HttpResponse::Ok().json(preview))
}

/// POST /budgets
pub async fn create_budget(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    request: web::Json<CreateBudgetRequest>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .create_budget(request.into_inner(), &operator)
        .await?;

    Ok(HttpResponse::Created().json(budget))
}

/// GET /budgets
pub async fn list_budgets(
    service: web::Data<Arc<BudgetService>>,
    _operator: Operator,
    query: web::Query<ListBudgetsQuery>,
) -> Result<HttpResponse, AppError> {
    let budgets = service
        .list_budgets(query.limit, query.offset, query.status)
        .await?;

    Ok(HttpResponse::Ok().json(budgets))
}

/// GET /budgets/{id}
pub async fn get_budget(
    service: web::Data<Arc<BudgetService>>,
    _operator: Operator,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let budget = service.get_budget(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(budget))
}

/// Replace the content of a draft budget
/// PUT /budgets/{id}
pub async fn update_budget(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<String>,
    request: web::Json<UpdateBudgetRequest>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .update_budget(&path.into_inner(), request.into_inner(), &operator)
        .await?;

    Ok(HttpResponse::Ok().json(budget))
}

/// POST /budgets/{id}/status
pub async fn change_status(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<String>,
    request: web::Json<ChangeStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .change_status(&path.into_inner(), request.status, &operator)
        .await?;

    Ok(HttpResponse::Ok().json(budget))
}

/// GET /budgets/{id}/versions
pub async fn list_versions(
    service: web::Data<Arc<BudgetService>>,
    _operator: Operator,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let versions = service.list_versions(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(versions))
}

/// Project generated after approval
/// GET /budgets/{id}/project
///
/// Answers 202 while the project has not been created yet.
pub async fn get_generated_project(
    service: web::Data<Arc<BudgetService>>,
    _operator: Operator,
    path: web::Path<String>,
    query: web::Query<ProjectQuery>,
) -> Result<HttpResponse, AppError> {
    let budget_id = path.into_inner();
    match service.generated_project(&budget_id, query.wait).await? {
        Some(project) => Ok(HttpResponse::Ok().json(project)),
        None => Ok(HttpResponse::Accepted().json(serde_json::json!({
            "budget_id": budget_id,
            "status": "pending",
        }))),
    }
}

/// POST /budgets/{id}/chapters
pub async fn add_chapter(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<String>,
    request: web::Json<ChapterRequest>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .add_chapter(&path.into_inner(), request.into_inner(), &operator)
        .await?;

    Ok(HttpResponse::Created().json(budget))
}

/// DELETE /budgets/{id}/chapters/{chapter_id}
pub async fn remove_chapter(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<ChapterPath>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .remove_chapter(&path.id, &path.chapter_id, &operator)
        .await?;

    Ok(HttpResponse::Ok().json(budget))
}

/// POST /budgets/{id}/chapters/{chapter_id}/items
pub async fn add_item(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<ChapterPath>,
    request: web::Json<LineItemRequest>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .add_item(&path.id, &path.chapter_id, request.into_inner(), &operator)
        .await?;

    Ok(HttpResponse::Created().json(budget))
}

/// PATCH /budgets/{id}/chapters/{chapter_id}/items/{item_id}
pub async fn update_item(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<ItemPath>,
    request: web::Json<UpdateLineItemRequest>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .update_item(
            &path.id,
            &path.chapter_id,
            &path.item_id,
            request.into_inner(),
            &operator,
        )
        .await?;

    Ok(HttpResponse::Ok().json(budget))
}

/// DELETE /budgets/{id}/chapters/{chapter_id}/items/{item_id}
pub async fn remove_item(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<ItemPath>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .remove_item(&path.id, &path.chapter_id, &path.item_id, &operator)
        .await?;

    Ok(HttpResponse::Ok().json(budget))
}

/// Copy a line item right after the original
/// POST /budgets/{id}/chapters/{chapter_id}/items/{item_id}/duplicate
pub async fn duplicate_item(
    service: web::Data<Arc<BudgetService>>,
    operator: Operator,
    path: web::Path<ItemPath>,
) -> Result<HttpResponse, AppError> {
    let budget = service
        .duplicate_item(&path.id, &path.chapter_id, &path.item_id, &operator)
        .await?;

    Ok(HttpResponse::Created().json(budget))
}

/// Configure budget routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/budgets")
            .route("/preview", web::post().to(preview_budget))
            .route("", web::post().to(create_budget))
            .route("", web::get().to(list_budgets))
            .route("/{id}", web::get().to(get_budget))
            .route("/{id}", web::put().to(update_budget))
            .route("/{id}/status", web::post().to(change_status))
            .route("/{id}/versions", web::get().to(list_versions))
            .route("/{id}/project", web::get().to(get_generated_project))
            .route("/{id}/chapters", web::post().to(add_chapter))
            .route("/{id}/chapters/{chapter_id}", web::delete().to(remove_chapter))
            .route("/{id}/chapters/{chapter_id}/items", web::post().to(add_item))
            .route(
                "/{id}/chapters/{chapter_id}/items/{item_id}",
                web::patch().to(update_item),
            )
            .route(
                "/{id}/chapters/{chapter_id}/items/{item_id}",
                web::delete().to(remove_item),
            )
            .route(
                "/{id}/chapters/{chapter_id}/items/{item_id}/duplicate",
                web::post().to(duplicate_item),
            ),
    );
}
