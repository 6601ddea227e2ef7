// In-process application wired to in-memory storage

use std::sync::Arc;
use std::time::Duration;

use obrabudget::modules::budgets::services::{BudgetService, ProjectPollSettings};

use super::{InMemoryBudgetRepository, InMemoryCredentialStore};

pub struct TestContext {
    pub repo: Arc<InMemoryBudgetRepository>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub service: Arc<BudgetService>,
}

/// Short polling so project waits finish quickly
pub fn fast_polling() -> ProjectPollSettings {
    ProjectPollSettings {
        attempts: 3,
        interval: Duration::from_millis(5),
    }
}

pub fn test_context() -> TestContext {
    let repo = Arc::new(InMemoryBudgetRepository::new());
    TestContext {
        service: Arc::new(BudgetService::new(repo.clone(), fast_polling())),
        credentials: Arc::new(InMemoryCredentialStore::seeded()),
        repo,
    }
}

/// Initialise the full API with authentication over a [`TestContext`]
#[macro_export]
macro_rules! init_test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.service.clone()))
                .wrap(obrabudget::middleware::OperatorAuth::new(
                    $ctx.credentials.clone(),
                ))
                .wrap(obrabudget::middleware::RequestId)
                .configure(obrabudget::configure_api),
        )
        .await
    };
}
