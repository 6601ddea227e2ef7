use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use obrabudget::config::{Config, LogFormat};
use obrabudget::configure_api;
use obrabudget::middleware::{
    ErrorHandler, MySqlCredentialStore, OperatorAuth, RateLimiter, RequestId,
};
use obrabudget::modules::budgets::{BudgetService, MySqlBudgetRepository};

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "obrabudget={},actix_web=info",
            config.app.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.app.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn cors(origin: Option<&str>) -> Cors {
    match origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-api-key"),
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
            .max_age(3600),
        None => Cors::default(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config);
    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::info!("Starting obrabudget");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    let db_pool = config
        .database
        .create_pool()
        .await
        .context("Failed to create database pool")?;

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    let repository = Arc::new(MySqlBudgetRepository::new(db_pool.clone()));
    let service = Arc::new(BudgetService::new(repository, config.projects));
    let auth = OperatorAuth::new(Arc::new(MySqlCredentialStore::new(db_pool.clone())));
    let rate_limiter = RateLimiter::new(config.security.rate_limit_per_minute)
        .context("Failed to build rate limiter")?;
    let cors_origin = config.security.cors_allowed_origin.clone();

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(service.clone()))
            .wrap(auth.clone())
            .wrap(rate_limiter.clone())
            .wrap(ErrorHandler)
            .wrap(RequestId)
            .wrap(cors(cors_origin.as_deref()))
            .wrap(TracingLogger::default())
            .configure(configure_api)
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await.context("Server terminated with an error")
}
