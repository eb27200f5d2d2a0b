#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use planboard::config::{Config, Environment};
use planboard::context::AppContext;
use planboard::logger::{Logger, MemorySink};

pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

/// A valid configuration backed by an in-memory database. `overrides` are
/// applied on top of the defaults.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("DATABASE_URL".into(), "sqlite::memory:".into());
    vars.insert("SESSION_SECRET".into(), TEST_SECRET.into());
    vars.insert("NODE_ENV".into(), "test".into());
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_source(&vars).expect("test configuration should be valid")
}

/// Connects a fresh in-memory database with the schema applied. Log records
/// are captured in the returned sink.
pub async fn test_context(overrides: &[(&str, &str)]) -> (AppContext, Arc<MemorySink>) {
    let config = Arc::new(test_config(overrides));
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::with_sink(Environment::Development, sink.clone());

    let ctx = AppContext::connect_with_logger(config, logger)
        .await
        .expect("Failed to connect to test DB");
    ctx.db.migrate().await.expect("Failed to run migrations");
    (ctx, sink)
}
