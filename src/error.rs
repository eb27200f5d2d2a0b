//!
//! # Error Taxonomy
//!
//! This module defines the closed set of failure kinds used throughout the
//! application ([`AppError`]), the wider [`Fault`] type that captures anything
//! a handler can fail with, and the client-safe [`ErrorPayload`] both are
//! reduced to before they leave the server.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so route handlers
//! and middleware can return it directly and get the matching status code
//! with a `{ "success": false, "error": { .. } }` JSON body.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::ValidationErrors;

/// Message returned to clients when a failure has no recognizable shape.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// The application's failure kinds.
///
/// Each kind maps to an HTTP status and, except for `Application` without a
/// code, a machine-readable code string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Generic failure (HTTP 500) with an optional handler-chosen code.
    Application {
        message: String,
        code: Option<String>,
    },
    /// Invalid input (HTTP 400), optionally naming the offending field.
    Validation {
        message: String,
        field: Option<String>,
    },
    /// Missing or invalid credentials (HTTP 401).
    Authentication(String),
    /// Authenticated but not permitted (HTTP 403).
    Authorization(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// Too many requests in the current window (HTTP 429).
    RateLimit(String),
}

impl AppError {
    pub fn application(message: impl Into<String>, code: Option<&str>) -> Self {
        AppError::Application {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    pub fn authentication() -> Self {
        AppError::Authentication("Authentication required".into())
    }

    pub fn authorization() -> Self {
        AppError::Authorization("Permission denied".into())
    }

    /// `resource` names what was missing, e.g. `AppError::not_found("Project")`.
    pub fn not_found(resource: &str) -> Self {
        AppError::NotFound(format!("{} not found", resource))
    }

    pub fn rate_limited() -> Self {
        AppError::RateLimit("Too many requests".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Application { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            AppError::Application { code, .. } => code.as_deref(),
            AppError::Validation { .. } => Some("VALIDATION_ERROR"),
            AppError::Authentication(_) => Some("AUTHENTICATION_ERROR"),
            AppError::Authorization(_) => Some("AUTHORIZATION_ERROR"),
            AppError::NotFound(_) => Some("NOT_FOUND"),
            AppError::RateLimit(_) => Some("RATE_LIMIT_ERROR"),
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            AppError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Application { message, .. } | AppError::Validation { message, .. } => {
                message
            }
            AppError::Authentication(message)
            | AppError::Authorization(message)
            | AppError::NotFound(message)
            | AppError::RateLimit(message) => message,
        }
    }

    /// Kind name as it appears in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AppError::Application { .. } => "AppError",
            AppError::Validation { .. } => "ValidationError",
            AppError::Authentication(_) => "AuthenticationError",
            AppError::Authorization(_) => "AuthorizationError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::RateLimit(_) => "RateLimitError",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl StdError for AppError {}

/// Converts `AppError` variants into `HttpResponse` objects carrying the
/// action-result error envelope.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status()).json(json!({
            "success": false,
            "error": ErrorPayload::from(self),
        }))
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// Only the first offending field (alphabetically) is reported; its name is
/// given in camelCase to match the JSON the client sent.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, field_errors)) => {
                let field = camel_case(field);
                let message = field_errors
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                AppError::validation(message, Some(&field))
            }
            None => AppError::validation(errors.to_string(), None),
        }
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// A plain failure that is not part of the taxonomy.
#[derive(Debug)]
struct PlainError(String);

impl fmt::Display for PlainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for PlainError {}

/// Anything an action handler can fail with.
#[derive(Debug)]
pub enum Fault {
    /// A failure from the taxonomy.
    App(AppError),
    /// Any other error value. Its message is passed on to clients.
    Error(Box<dyn StdError + Send + Sync + 'static>),
    /// A value that is not an error at all, such as a panic payload.
    Value(Value),
}

impl Fault {
    /// A plain error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Fault::Error(Box::new(PlainError(message.into())))
    }

    pub fn error(error: impl StdError + Send + Sync + 'static) -> Self {
        Fault::Error(Box::new(error))
    }

    pub fn value(value: Value) -> Self {
        Fault::Value(value)
    }

    /// Wraps a payload caught from a panicking handler. String payloads are
    /// kept for the logs; anything else becomes `null`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let value = match payload.downcast::<String>() {
            Ok(message) => Value::String(*message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Value::String((*message).to_string()),
                Err(_) => Value::Null,
            },
        };
        Fault::Value(value)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Fault::App(error) => error.status(),
            Fault::Error(_) | Fault::Value(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Representation used under the `error` key of a log entry.
    pub fn log_value(&self) -> Value {
        match self {
            Fault::App(error) => json!({
                "message": error.message(),
                "name": error.name(),
                "code": error.code(),
                "stack": format!("{}: {}", error.name(), error.message()),
            }),
            Fault::Error(error) => {
                let mut stack = format!("Error: {}", error);
                let mut source = error.source();
                while let Some(cause) = source {
                    stack.push_str(&format!("\n    caused by: {}", cause));
                    source = cause.source();
                }
                json!({
                    "message": error.to_string(),
                    "name": "Error",
                    "stack": stack,
                })
            }
            Fault::Value(value) => value.clone(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::App(error) => write!(f, "{}: {}", error.name(), error),
            Fault::Error(error) => write!(f, "{}", error),
            Fault::Value(value) => write!(f, "non-error value: {}", value),
        }
    }
}

impl From<AppError> for Fault {
    fn from(error: AppError) -> Fault {
        Fault::App(error)
    }
}

impl From<ValidationErrors> for Fault {
    fn from(errors: ValidationErrors) -> Fault {
        Fault::App(errors.into())
    }
}

/// Converts `sqlx::Error` into a `Fault`.
///
/// `RowNotFound` becomes a not-found failure; other database errors stay
/// plain errors.
impl From<sqlx::Error> for Fault {
    fn from(error: sqlx::Error) -> Fault {
        match error {
            sqlx::Error::RowNotFound => Fault::App(AppError::not_found("Record")),
            other => Fault::error(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Fault {
    fn from(error: sqlx::migrate::MigrateError) -> Fault {
        Fault::error(error)
    }
}

impl From<std::io::Error> for Fault {
    fn from(error: std::io::Error) -> Fault {
        Fault::error(error)
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for Fault {
    fn from(error: Box<dyn StdError + Send + Sync + 'static>) -> Fault {
        Fault::Error(error)
    }
}

impl From<Value> for Fault {
    fn from(value: Value) -> Fault {
        Fault::Value(value)
    }
}

fn internal_status() -> u16 {
    StatusCode::INTERNAL_SERVER_ERROR.as_u16()
}

/// HTTP status of a taxonomy code. Unknown or missing codes are internal
/// errors.
pub fn status_for_code(code: Option<&str>) -> StatusCode {
    match code {
        Some("VALIDATION_ERROR") => StatusCode::BAD_REQUEST,
        Some("AUTHENTICATION_ERROR") => StatusCode::UNAUTHORIZED,
        Some("AUTHORIZATION_ERROR") => StatusCode::FORBIDDEN,
        Some("NOT_FOUND") => StatusCode::NOT_FOUND,
        Some("RATE_LIMIT_ERROR") => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-safe description of a failure.
///
/// `status` is kept for the transport layer and is not serialized; on
/// deserialization it is recovered from `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireErrorPayload")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing)]
    pub status: u16,
}

#[derive(Deserialize)]
struct WireErrorPayload {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    field: Option<String>,
}

impl From<WireErrorPayload> for ErrorPayload {
    fn from(wire: WireErrorPayload) -> Self {
        ErrorPayload {
            status: status_for_code(wire.code.as_deref()).as_u16(),
            message: wire.message,
            code: wire.code,
            field: wire.field,
        }
    }
}

impl ErrorPayload {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&AppError> for ErrorPayload {
    fn from(error: &AppError) -> Self {
        ErrorPayload {
            message: error.message().to_string(),
            code: error.code().map(str::to_string),
            field: error.field().map(str::to_string),
            status: error.status().as_u16(),
        }
    }
}

/// Reduces any fault to the payload handed back to callers.
///
/// Taxonomy errors keep their message and code (and field, for validation);
/// other errors keep only their message; anything else is replaced by
/// [`UNEXPECTED_ERROR_MESSAGE`].
pub fn to_action_error(fault: &Fault) -> ErrorPayload {
    match fault {
        Fault::App(error) => ErrorPayload::from(error),
        Fault::Error(error) => ErrorPayload {
            message: error.to_string(),
            code: None,
            field: None,
            status: internal_status(),
        },
        Fault::Value(_) => ErrorPayload {
            message: UNEXPECTED_ERROR_MESSAGE.to_string(),
            code: None,
            field: None,
            status: internal_status(),
        },
    }
}
