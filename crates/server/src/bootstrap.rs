use std::sync::Arc;

use reqflow_core::config::{AppConfig, ConfigError, LoadOptions};
use reqflow_core::notify::{EmailTemplates, NotifyError};
use reqflow_db::{
    connect_with_config, migrations, DbPool, SqlRequisitionRepository, SqlUserRepository,
};
use thiserror::Error;
use tracing::info;

use crate::audit_sink::TracingAuditSink;
use crate::mailer::{build_notifier, MailerError};
use crate::service::{RequisitionService, ServiceDeps};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: RequisitionService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("email notifier setup failed: {0}")]
    Mailer(#[from] MailerError),
    #[error("email templates failed to load: {0}")]
    Templates(#[source] NotifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let notifier = build_notifier(&config.email)?;
    let templates = EmailTemplates::embedded().map_err(BootstrapError::Templates)?;
    info!(
        event_name = "system.bootstrap.notifier_ready",
        correlation_id = "bootstrap",
        provider = ?config.email.provider,
        "email notifier initialized"
    );

    let service = RequisitionService::new(
        &config,
        ServiceDeps {
            requisitions: Arc::new(SqlRequisitionRepository::new(db_pool.clone())),
            users: Arc::new(SqlUserRepository::new(db_pool.clone())),
            notifier,
            templates,
            audit: Arc::new(TracingAuditSink),
        },
    );

    Ok(Application { config, db_pool, service })
}
