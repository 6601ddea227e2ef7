//! Construction budget management service
//!
//! Prices construction budgets by chapters and line items, applies the
//! general expenses, industrial benefit, discount and tax cascade, and tracks
//! each budget through review and approval.

use actix_web::web;

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use modules::budgets;

/// Register every route and the extractor error handlers
///
/// Expects `web::Data<Arc<BudgetService>>` and `web::Data<MySqlPool>` to be
/// registered by the caller; `/ready` is the only route using the pool.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(middleware::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(middleware::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(middleware::path_error_handler))
        .configure(modules::health::configure)
        .configure(modules::budgets::controllers::configure);
}
