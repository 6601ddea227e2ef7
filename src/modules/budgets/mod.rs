// Budgets module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{
    Breakdown, Budget, BudgetStatus, CascadeCalculator, CascadeRates, Chapter, LineItem,
};
pub use repositories::{BudgetRepository, MySqlBudgetRepository};
pub use services::BudgetService;
