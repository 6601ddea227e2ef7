use std::sync::Arc;
use std::time::Duration;

use crate::core::Result;
use crate::modules::budgets::models::GeneratedProject;
use crate::modules::budgets::repositories::BudgetRepository;

/// How long to wait for the external trigger to create a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectPollSettings {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ProjectPollSettings {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// Polls storage for the project an approved budget spawns downstream
///
/// The project is created by a database trigger outside this service's
/// control, so all we can do is look for it a bounded number of times.
pub struct ProjectPoller {
    repo: Arc<dyn BudgetRepository>,
    settings: ProjectPollSettings,
}

impl ProjectPoller {
    pub fn new(repo: Arc<dyn BudgetRepository>, settings: ProjectPollSettings) -> Self {
        Self { repo, settings }
    }

    /// Look for the project up to `attempts` times, sleeping between tries
    pub async fn poll(&self, budget_id: &str) -> Result<Option<GeneratedProject>> {
        for attempt in 1..=self.settings.attempts {
            if let Some(project) = self.repo.find_generated_project(budget_id).await? {
                tracing::info!(
                    budget_id = %budget_id,
                    project_id = %project.id,
                    attempt,
                    "Generated project found"
                );
                return Ok(Some(project));
            }

            if attempt < self.settings.attempts {
                tokio::time::sleep(self.settings.interval).await;
            }
        }

        tracing::info!(
            budget_id = %budget_id,
            attempts = self.settings.attempts,
            "Generated project not available yet"
        );
        Ok(None)
    }
}
