//!
//! # Structured Logging
//!
//! [`Logger`] renders every entry as
//! `[<timestamp>] [<LEVEL>] <message> <json context>` and hands it to a
//! [`LogSink`]. The default sink forwards to the `log` facade, which the
//! binaries back with `env_logger` through [`init`].
//!
//! Debug entries are dropped unless the process runs in development.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use log::Level;
use serde_json::{Map, Value};

use crate::config::Environment;
use crate::error::Fault;

/// Target used for entries emitted through the `log` facade.
pub const LOG_TARGET: &str = "planboard";

/// Open-ended contextual metadata attached to a log entry.
pub type LogContext = Map<String, Value>;

/// Builds a [`LogContext`] from `key => value` pairs. Values only need to
/// implement `Serialize`.
#[macro_export]
macro_rules! log_context {
    () => {
        $crate::logger::LogContext::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut context = $crate::logger::LogContext::new();
        $(
            context.insert(
                ($key).to_string(),
                ::serde_json::to_value(&$value).unwrap_or(::serde_json::Value::Null),
            );
        )+
        context
    }};
}

/// Formats a single output line. Shared by [`LogRecord::line`] and the
/// `env_logger` formatter installed by [`init`].
pub fn format_line(timestamp: &DateTime<Utc>, level: Level, body: &str) -> String {
    format!(
        "[{}] [{}] {}",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        level,
        body
    )
}

/// One emitted log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub context: LogContext,
}

impl LogRecord {
    /// Message followed by the serialized context, if there is any.
    pub fn body(&self) -> String {
        if self.context.is_empty() {
            return self.message.clone();
        }
        let context = serde_json::to_string(&self.context).unwrap_or_default();
        format!("{} {}", self.message, context)
    }

    pub fn line(&self) -> String {
        format_line(&self.timestamp, self.level, &self.body())
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Forwards records to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn emit(&self, record: LogRecord) {
        log::log!(target: LOG_TARGET, record.level, "{}", record.body());
    }
}

/// Keeps records in memory. Used by tests to assert on what was logged.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

/// Application logger. Cheap to clone; clones share the sink.
#[derive(Clone)]
pub struct Logger {
    debug_enabled: bool,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("debug_enabled", &self.debug_enabled)
            .finish_non_exhaustive()
    }
}

impl Logger {
    pub fn new(environment: Environment) -> Self {
        Self::with_sink(environment, Arc::new(ConsoleSink))
    }

    pub fn with_sink(environment: Environment, sink: Arc<dyn LogSink>) -> Self {
        Self {
            debug_enabled: environment.is_development(),
            sink,
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    pub fn debug(&self, message: impl Into<String>, context: Option<LogContext>) {
        if self.debug_enabled {
            self.emit(Level::Debug, message.into(), context.unwrap_or_default());
        }
    }

    pub fn info(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.emit(Level::Info, message.into(), context.unwrap_or_default());
    }

    pub fn warn(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.emit(Level::Warn, message.into(), context.unwrap_or_default());
    }

    /// Logs at error level. A structured `error` contributes its message,
    /// kind name and cause chain under the `error` key; a raw value is
    /// logged as-is.
    pub fn error(
        &self,
        message: impl Into<String>,
        error: Option<&Fault>,
        context: Option<LogContext>,
    ) {
        let mut context = context.unwrap_or_default();
        if let Some(fault) = error {
            context.insert("error".to_string(), fault.log_value());
        }
        self.emit(Level::Error, message.into(), context);
    }

    fn emit(&self, level: Level, message: String, context: LogContext) {
        self.sink.emit(LogRecord {
            timestamp: Utc::now(),
            level,
            message,
            context,
        });
    }
}

/// Warnings and errors go to stderr, everything else to stdout.
pub fn writes_to_stderr(level: Level) -> bool {
    level <= Level::Warn
}

/// Installs `env_logger` as the `log` backend using the structured line
/// format. `RUST_LOG` overrides the default filter (debug in development,
/// info otherwise). Calling it more than once is harmless.
pub fn init(environment: Environment) {
    let default_filter = if environment.is_development() {
        "debug"
    } else {
        "info"
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let line = format_line(&Utc::now(), record.level(), &record.args().to_string());
            if writes_to_stderr(record.level()) {
                writeln!(io::stderr().lock(), "{}", line)
            } else {
                writeln!(buf, "{}", line)
            }
        })
        .target(env_logger::Target::Stdout)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::TimeZone;
    use serde_json::json;

    fn memory_logger(environment: Environment) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Logger::with_sink(environment, sink.clone()), sink)
    }

    #[test]
    fn test_line_format() {
        let record = LogRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 15, 8, 30, 0).unwrap(),
            level: Level::Warn,
            message: "Disk almost full".to_string(),
            context: log_context! { "free_mb" => 12 },
        };
        assert_eq!(
            record.line(),
            r#"[2026-03-15T08:30:00.000Z] [WARN] Disk almost full {"free_mb":12}"#
        );
    }

    #[test]
    fn test_output_stream_by_level() {
        assert!(writes_to_stderr(Level::Error));
        assert!(writes_to_stderr(Level::Warn));
        assert!(!writes_to_stderr(Level::Info));
        assert!(!writes_to_stderr(Level::Debug));
        assert!(!writes_to_stderr(Level::Trace));
    }

    #[test]
    fn test_empty_context_has_no_suffix() {
        let (logger, sink) = memory_logger(Environment::Production);
        logger.info("Server started", None);
        logger.info("Still running", Some(LogContext::new()));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].line().ends_with("[INFO] Server started"));
        assert_eq!(records[1].body(), "Still running");
    }

    #[test]
    fn test_debug_suppressed_outside_development() {
        let (logger, sink) = memory_logger(Environment::Production);
        logger.debug("hidden", None);
        logger.warn("visible", None);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0].level, Level::Warn);

        let (logger, sink) = memory_logger(Environment::Test);
        logger.debug("hidden", None);
        assert!(sink.records().is_empty());

        let (logger, sink) = memory_logger(Environment::Development);
        logger.debug("shown", Some(log_context! { "a" => 1 }));
        assert_eq!(sink.at_level(Level::Debug).len(), 1);
    }

    #[test]
    fn test_error_extracts_structured_fields() {
        let (logger, sink) = memory_logger(Environment::Production);
        let fault = Fault::from(AppError::validation("Email is invalid", Some("email")));
        logger.error(
            "Signup failed",
            Some(&fault),
            Some(log_context! { "attempt" => 2 }),
        );

        let record = &sink.records()[0];
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.context["attempt"], json!(2));
        assert_eq!(record.context["error"]["message"], json!("Email is invalid"));
        assert_eq!(record.context["error"]["name"], json!("ValidationError"));
        assert!(record.context["error"]["stack"].is_string());
    }

    #[test]
    fn test_error_logs_raw_values() {
        let (logger, sink) = memory_logger(Environment::Production);
        let fault = Fault::value(json!("just a string"));
        logger.error("Something odd", Some(&fault), None);

        assert_eq!(sink.records()[0].context["error"], json!("just a string"));
    }

    #[test]
    fn test_error_without_fault_keeps_context() {
        let (logger, sink) = memory_logger(Environment::Production);
        logger.error("No details", None, None);
        assert!(sink.records()[0].context.is_empty());
    }
}
