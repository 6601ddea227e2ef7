pub mod budget_repository;
pub mod mysql_budget_repository;

pub use budget_repository::{BudgetRepository, ListBudgets};
pub use mysql_budget_repository::MySqlBudgetRepository;
