//! SQLite storage handle.

use std::str::FromStr;

use log::LevelFilter;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};

use crate::config::Config;
use crate::log_context;
use crate::logger::Logger;

/// Schema migrations embedded from `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Shared connection pool. Clones share the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    logger: Logger,
}

impl Database {
    /// Opens the pool described by `config.database_url`, creating the
    /// database file if needed. Statements are logged at debug level in
    /// development only.
    pub async fn connect(config: &Config, logger: &Logger) -> Result<Self, sqlx::Error> {
        let statement_level = if config.environment.is_development() {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        };
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .log_statements(statement_level);

        // An in-memory database lives only as long as a connection to it.
        let pool_options = if is_in_memory(&config.database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        logger.info(
            "Database connected",
            Some(log_context! {
                "provider" => "sqlite",
                "environment" => config.environment,
            }),
        );

        Ok(Self {
            pool,
            logger: logger.clone(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    /// True if the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes every connection. Waits for checked-out connections to return.
    pub async fn disconnect(&self) {
        self.pool.close().await;
        self.logger.info("Database disconnected", None);
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:demo?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://planboard.db"));
    }
}
