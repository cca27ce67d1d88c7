use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::AppConfig;
use crate::migrator::Migrator;

/// Database connection settings beyond the URL.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };
    establish_connection_with_config(&config).await
}

pub async fn establish_connection_with_config(
    config: &DbConfig,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(false);

    let connection = Database::connect(options).await?;
    info!("Database connection established");
    Ok(connection)
}

pub async fn establish_connection_from_app_config(
    config: &AppConfig,
) -> Result<DatabaseConnection, DbErr> {
    establish_connection(&config.database_url).await
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running pending database migrations");
    Migrator::up(db, None).await
}
