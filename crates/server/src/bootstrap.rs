use chrono::{Datelike, Utc};
use monthbook_core::config::{AppConfig, ConfigError, LoadOptions};
use monthbook_db::{connect_with_settings, migrations, DbPool, MonthStore, StoreError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("initial month seeding failed: {0}")]
    SeedMonth(#[source] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Brings the application up from an already-loaded config: open the pool,
/// apply migrations, make sure one open month exists.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let now = Utc::now();
    if let Some(month) = MonthStore::new(db_pool.clone())
        .seed_initial(now.year(), now.month())
        .await
        .map_err(BootstrapError::SeedMonth)?
    {
        info!(
            event_name = "system.bootstrap.month_seeded",
            month_id = month.id,
            year = month.year,
            month = month.month,
            "seeded initial open month"
        );
    }

    Ok(Application { config, db_pool })
}
