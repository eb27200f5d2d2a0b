use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::logger::Logger;

/// Everything a request or job needs: configuration, logger and storage.
///
/// Built once at process start, read-only afterwards, and torn down with
/// [`AppContext::shutdown`].
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub logger: Logger,
    pub db: Database,
}

impl AppContext {
    pub async fn connect(config: Arc<Config>) -> Result<Self, sqlx::Error> {
        let logger = Logger::new(config.environment);
        Self::connect_with_logger(config, logger).await
    }

    pub async fn connect_with_logger(
        config: Arc<Config>,
        logger: Logger,
    ) -> Result<Self, sqlx::Error> {
        let db = Database::connect(&config, &logger).await?;
        Ok(Self { config, logger, db })
    }

    pub async fn shutdown(&self) {
        self.db.disconnect().await;
    }
}
