pub mod budget_service;
pub mod project_poller;

pub use budget_service::BudgetService;
pub use project_poller::{ProjectPollSettings, ProjectPoller};
