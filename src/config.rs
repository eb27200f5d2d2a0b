//!
//! # Environment Configuration
//!
//! Reads the process environment once at startup, coerces and validates it
//! against a fixed schema, and produces an immutable [`Config`].
//!
//! Validation failures are collected per variable and returned together as a
//! [`ConfigError`]; binaries propagate it out of `main` so a misconfigured
//! process never starts serving.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::{Arc, OnceLock};

use validator::Validate;

const DEFAULT_SESSION_MAX_AGE: i64 = 604_800; // 7 days
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_BCRYPT_ROUNDS: i64 = 12;
const DEFAULT_RATE_LIMIT_MAX: i64 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_MS: i64 = 60_000;
const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: i64 = 8080;

/// Where configuration values are read from.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<S: EnvSource + ?Sized> EnvSource for &S {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// The mode the process runs in (`NODE_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "development" => Some(Environment::Development),
            "production" => Some(Environment::Production),
            "test" => Some(Environment::Test),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated application configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    /// Session lifetime in seconds.
    pub session_max_age: u64,
    pub environment: Environment,
    pub app_url: String,
    pub bcrypt_rounds: u32,
    pub rate_limit_max: u32,
    pub rate_limit_window_ms: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("session_secret", &"[redacted]")
            .field("session_max_age", &self.session_max_age)
            .field("environment", &self.environment)
            .field("app_url", &self.app_url)
            .field("bcrypt_rounds", &self.bcrypt_rounds)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window_ms", &self.rate_limit_window_ms)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Reads and validates the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    /// Reads and validates configuration from an arbitrary source.
    pub fn from_source<S: EnvSource + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();

        let raw = RawConfig {
            database_url: required(source, "DATABASE_URL", &mut errors),
            session_secret: required(source, "SESSION_SECRET", &mut errors),
            session_max_age: integer(
                source,
                "SESSION_MAX_AGE",
                DEFAULT_SESSION_MAX_AGE,
                &mut errors,
            ),
            next_public_app_url: source
                .var("NEXT_PUBLIC_APP_URL")
                .unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            bcrypt_rounds: integer(source, "BCRYPT_ROUNDS", DEFAULT_BCRYPT_ROUNDS, &mut errors),
            rate_limit_max: integer(source, "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX, &mut errors),
            rate_limit_window_ms: integer(
                source,
                "RATE_LIMIT_WINDOW_MS",
                DEFAULT_RATE_LIMIT_WINDOW_MS,
                &mut errors,
            ),
            server_port: integer(source, "SERVER_PORT", DEFAULT_SERVER_PORT, &mut errors),
        };

        let environment = match source.var("NODE_ENV") {
            None => Environment::default(),
            Some(value) => Environment::parse(&value).unwrap_or_else(|| {
                errors.push(FieldError::new(
                    "NODE_ENV",
                    "expected one of development, production, test",
                ));
                Environment::default()
            }),
        };

        if let Err(validation) = raw.validate() {
            let mut fields: Vec<_> = validation.field_errors().into_iter().collect();
            fields.sort_by_key(|(field, _)| *field);
            for (field, field_errors) in fields {
                let key = field.to_uppercase();
                // Keys that already failed coercion carry a placeholder value.
                if errors.iter().any(|e| e.key == key) {
                    continue;
                }
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    errors.push(FieldError::new(&key, message));
                }
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError { errors });
        }

        // Ranges were validated above, so these narrowing casts are lossless.
        Ok(Config {
            database_url: raw.database_url,
            session_secret: raw.session_secret,
            session_max_age: raw.session_max_age as u64,
            environment,
            app_url: raw.next_public_app_url,
            bcrypt_rounds: raw.bcrypt_rounds as u32,
            rate_limit_max: raw.rate_limit_max as u32,
            rate_limit_window_ms: raw.rate_limit_window_ms as u64,
            server_host: source
                .var("SERVER_HOST")
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: raw.server_port as u16,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

/// Environment values after coercion, before range checks.
///
/// Field names are the lowercased variable names so validation errors map
/// straight back to the variable that caused them.
#[derive(Debug, Validate)]
struct RawConfig {
    #[validate(length(min = 1, message = "DATABASE_URL is required"))]
    database_url: String,
    #[validate(length(min = 32, message = "SESSION_SECRET must be at least 32 characters"))]
    session_secret: String,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    session_max_age: i64,
    #[validate(url(message = "must be a valid URL"))]
    next_public_app_url: String,
    #[validate(range(min = 10, max = 15, message = "must be an integer between 10 and 15"))]
    bcrypt_rounds: i64,
    #[validate(range(min = 1, max = 4294967295, message = "must be a positive integer"))]
    rate_limit_max: i64,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    rate_limit_window_ms: i64,
    #[validate(range(min = 1, max = 65535, message = "must be a port between 1 and 65535"))]
    server_port: i64,
}

fn required<S: EnvSource + ?Sized>(source: &S, key: &str, errors: &mut Vec<FieldError>) -> String {
    match source.var(key) {
        Some(value) => value,
        None => {
            errors.push(FieldError::new(key, "Required"));
            String::new()
        }
    }
}

fn integer<S: EnvSource + ?Sized>(
    source: &S,
    key: &str,
    default: i64,
    errors: &mut Vec<FieldError>,
) -> i64 {
    match source.var(key) {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            errors.push(FieldError::new(
                key,
                format!("expected an integer, received {:?}", value),
            ));
            default
        }),
    }
}

/// A single invalid environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub key: String,
    pub message: String,
}

impl FieldError {
    fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Returned when the environment does not satisfy the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub errors: Vec<FieldError>,
}

impl ConfigError {
    pub fn has_key(&self, key: &str) -> bool {
        self.errors.iter().any(|e| e.key == key)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid environment variables")?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, error.key, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// Validates configuration on first use and hands out the cached result
/// afterwards. The source is never consulted again once a value is cached.
pub struct ConfigLoader<S = ProcessEnv> {
    source: S,
    cached: OnceLock<Arc<Config>>,
}

impl ConfigLoader<ProcessEnv> {
    pub fn from_process_env() -> Self {
        Self::new(ProcessEnv)
    }
}

impl<S: EnvSource> ConfigLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<Config>, ConfigError> {
        if let Some(config) = self.cached.get() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(Config::from_source(&self.source)?);
        Ok(Arc::clone(self.cached.get_or_init(|| config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        vars(&[("DATABASE_URL", "sqlite::memory:"), ("SESSION_SECRET", SECRET)])
    }

    struct CountingSource {
        inner: HashMap<String, String>,
        reads: Cell<usize>,
    }

    impl EnvSource for CountingSource {
        fn var(&self, key: &str) -> Option<String> {
            self.reads.set(self.reads.get() + 1);
            self.inner.var(key)
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_source(&minimal()).unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.session_max_age, 604_800);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.app_url, "http://localhost:3000");
        assert_eq!(config.bcrypt_rounds, 12);
        assert_eq!(config.rate_limit_max, 10);
        assert_eq!(config.rate_limit_window_ms, 60_000);
        assert_eq!(config.server_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_custom_values() {
        let mut env = minimal();
        env.extend(vars(&[
            ("NODE_ENV", "production"),
            ("BCRYPT_ROUNDS", "14"),
            ("RATE_LIMIT_MAX", "3"),
            ("SERVER_PORT", "3001"),
            ("SERVER_HOST", "0.0.0.0"),
            ("NEXT_PUBLIC_APP_URL", "https://planboard.example.com"),
        ]));

        let config = Config::from_source(&env).unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bcrypt_rounds, 14);
        assert_eq!(config.rate_limit_max, 3);
        assert_eq!(config.server_url(), "http://0.0.0.0:3001");
        assert_eq!(config.app_url, "https://planboard.example.com");
    }

    #[test]
    fn test_missing_required_fields() {
        let err = Config::from_source(&HashMap::<String, String>::new()).unwrap_err();
        assert!(err.has_key("DATABASE_URL"));
        assert!(err.has_key("SESSION_SECRET"));
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_empty_database_url_rejected() {
        let mut env = minimal();
        env.insert("DATABASE_URL".into(), String::new());
        let err = Config::from_source(&env).unwrap_err();
        assert_eq!(err.errors[0].message, "DATABASE_URL is required");
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut env = minimal();
        env.insert("SESSION_SECRET".into(), "0123456789".into());
        let err = Config::from_source(&env).unwrap_err();
        assert!(err.has_key("SESSION_SECRET"));
        assert!(err.to_string().contains("at least 32 characters"));
    }

    #[test]
    fn test_bcrypt_rounds_out_of_range() {
        let mut env = minimal();
        env.insert("BCRYPT_ROUNDS".into(), "20".into());
        assert!(Config::from_source(&env).unwrap_err().has_key("BCRYPT_ROUNDS"));

        env.insert("BCRYPT_ROUNDS".into(), "9".into());
        assert!(Config::from_source(&env).unwrap_err().has_key("BCRYPT_ROUNDS"));
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        let mut env = minimal();
        env.insert("RATE_LIMIT_WINDOW_MS".into(), "soon".into());
        env.insert("SESSION_MAX_AGE".into(), "".into());
        let err = Config::from_source(&env).unwrap_err();
        assert!(err.has_key("RATE_LIMIT_WINDOW_MS"));
        assert!(err.has_key("SESSION_MAX_AGE"));
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_non_positive_values_rejected() {
        let mut env = minimal();
        env.insert("RATE_LIMIT_MAX".into(), "0".into());
        assert!(Config::from_source(&env).unwrap_err().has_key("RATE_LIMIT_MAX"));
    }

    #[test]
    fn test_invalid_environment_and_url() {
        let mut env = minimal();
        env.insert("NODE_ENV".into(), "staging".into());
        env.insert("NEXT_PUBLIC_APP_URL".into(), "not a url".into());
        let err = Config::from_source(&env).unwrap_err();
        assert!(err.has_key("NODE_ENV"));
        assert!(err.has_key("NEXT_PUBLIC_APP_URL"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_source(&minimal()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn test_loader_caches_first_result() {
        let source = CountingSource {
            inner: minimal(),
            reads: Cell::new(0),
        };
        let loader = ConfigLoader::new(&source);

        let first = loader.get().unwrap();
        let reads_after_first = source.reads.get();
        assert!(reads_after_first > 0);

        let second = loader.get().unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.reads.get(), reads_after_first);
    }

    #[test]
    fn test_loader_does_not_cache_failures() {
        let loader = ConfigLoader::new(HashMap::<String, String>::new());
        assert!(loader.get().is_err());
        assert!(loader.get().is_err());
    }

    #[test]
    fn test_process_env_loader_matches_direct_read() {
        let loader = ConfigLoader::from_process_env();
        match (loader.get(), Config::from_env()) {
            (Ok(cached), Ok(direct)) => {
                assert_eq!(*cached, direct);
                assert!(Arc::ptr_eq(&cached, &loader.get().unwrap()));
            }
            (Err(cached), Err(direct)) => assert_eq!(cached.to_string(), direct.to_string()),
            (cached, direct) => panic!("loader {:?} disagrees with {:?}", cached, direct),
        }
    }
}
