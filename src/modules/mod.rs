pub mod budgets;
pub mod health;
