use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use casenote_agent::{DraftGenerator, GroqClient, LlmError};
use casenote_core::config::{AppConfig, ConfigError, LoadOptions};
use casenote_core::crm::{CrmDirectory, CrmLoadError};
use casenote_core::export::JsonlExportLog;
use casenote_db::repositories::{SqlSummaryRepository, SqlThreadRepository};
use casenote_db::{connect, migrations, DbPool};

use crate::api::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("CRM directory load failed: {0}")]
    CrmLoad(#[from] CrmLoadError),
    #[error("LLM client init failed: {0}")]
    LlmInit(#[from] LlmError),
    #[error("export directory setup failed: {0}")]
    ExportDir(#[source] std::io::Error),
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

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let crm = match (&config.crm.orders_path, &config.crm.customers_path) {
        (Some(orders), Some(customers)) => CrmDirectory::from_json_files(orders, customers)?,
        _ => CrmDirectory::bundled(),
    };

    let llm_client = GroqClient::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.timeout_secs,
    )?;
    let generator = DraftGenerator::new(Some(Arc::new(llm_client)));

    std::fs::create_dir_all(&config.export.output_dir).map_err(BootstrapError::ExportDir)?;
    let approved_log = JsonlExportLog::new(config.export.approved_summaries_path());
    let crm_notes_log = JsonlExportLog::new(config.export.crm_notes_path());

    let api_state = ApiState::new(
        Arc::new(SqlThreadRepository::new(db_pool.clone())),
        Arc::new(SqlSummaryRepository::new(db_pool.clone())),
        Arc::new(crm),
        Arc::new(generator),
        Arc::new(approved_log),
        Arc::new(crm_notes_log),
        config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string()),
    );

    Ok(Application { config, db_pool, api_state })
}

#[cfg(test)]
mod tests {
    use casenote_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn memory_options(output_dir: &std::path::Path) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                output_dir: Some(output_dir.to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_creates_export_dir() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let output_dir = dir.path().join("output");

        let app = bootstrap(memory_options(&output_dir)).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('thread', 'summary')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables present after bootstrap");
        assert_eq!(table_count, 2);

        assert!(output_dir.is_dir(), "export output dir should be created");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://nope".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("invalid database url must fail").to_string();
        assert!(message.contains("database.url"));
    }
}
