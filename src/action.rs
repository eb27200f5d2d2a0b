//!
//! # Action Results
//!
//! [`action_wrapper`] turns a fallible async handler into an [`Action`]
//! whose [`Action::call`] never fails: it always resolves to an
//! [`ActionResult`], logging the input (on request), the outcome, and any
//! failure along the way.
//!
//! ```rust,ignore
//! let action = action_wrapper(
//!     &logger,
//!     |id: Uuid| async move { Project::find(&pool, id).await },
//!     ActionOptions::named("get-project"),
//! );
//! let result = action.call(project_id).await;
//! ```

use std::any::type_name;
use std::future::Future;
use std::fmt;
use std::panic::AssertUnwindSafe;

use actix_web::{body::BoxBody, HttpRequest, HttpResponse, Responder};
use futures::FutureExt;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{to_action_error, ErrorPayload, Fault};
use crate::log_context;
use crate::logger::{LogContext, Logger};

/// Label used when an action has neither an explicit nor a derivable name.
pub const ANONYMOUS_ACTION: &str = "anonymous-action";

/// Outcome of an action: `{ success: true, data }` or
/// `{ success: false, error: { message, code?, field? } }` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<T> {
    Success(T),
    Failure(ErrorPayload),
}

impl<T> ActionResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ActionResult::Success(data) => Some(data),
            ActionResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorPayload> {
        match self {
            ActionResult::Success(_) => None,
            ActionResult::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, ErrorPayload> {
        match self {
            ActionResult::Success(data) => Ok(data),
            ActionResult::Failure(error) => Err(error),
        }
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ActionResult", 2)?;
        match self {
            ActionResult::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ActionResult::Failure(error) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ActionResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            success: bool,
            #[serde(default)]
            data: Option<Value>,
            #[serde(default)]
            error: Option<ErrorPayload>,
        }

        let envelope = Envelope::deserialize(deserializer)?;
        if envelope.success {
            let data = envelope.data.unwrap_or(Value::Null);
            T::deserialize(data)
                .map(ActionResult::Success)
                .map_err(de::Error::custom)
        } else {
            envelope
                .error
                .map(ActionResult::Failure)
                .ok_or_else(|| de::Error::missing_field("error"))
        }
    }
}

/// Success responds 200; failure responds with the failure's status.
impl<T: Serialize> Responder for ActionResult<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        let status = match &self {
            ActionResult::Success(_) => actix_web::http::StatusCode::OK,
            ActionResult::Failure(error) => error.status_code(),
        };
        HttpResponse::build(status).json(self)
    }
}

type InputEncoder<I> = fn(&I) -> Value;

fn encode_input<I: Serialize>(input: &I) -> Value {
    serde_json::to_value(input).unwrap_or(Value::Null)
}

/// Settings for [`action_wrapper`].
///
/// Input logging is off by default so request payloads stay out of the logs.
/// Turning it on needs a serializable input; other inputs can still be
/// wrapped, they just cannot be logged.
pub struct ActionOptions<I> {
    pub action_name: Option<String>,
    input_encoder: Option<InputEncoder<I>>,
}

impl<I> ActionOptions<I> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            action_name: Some(name.into()),
            input_encoder: None,
        }
    }

    pub fn logs_input(&self) -> bool {
        self.input_encoder.is_some()
    }
}

impl<I: Serialize> ActionOptions<I> {
    pub fn log_input(mut self, enabled: bool) -> Self {
        self.input_encoder = if enabled {
            Some(encode_input::<I> as InputEncoder<I>)
        } else {
            None
        };
        self
    }
}

impl<I> Default for ActionOptions<I> {
    fn default() -> Self {
        Self {
            action_name: None,
            input_encoder: None,
        }
    }
}

impl<I> Clone for ActionOptions<I> {
    fn clone(&self) -> Self {
        Self {
            action_name: self.action_name.clone(),
            input_encoder: self.input_encoder,
        }
    }
}

impl<I> fmt::Debug for ActionOptions<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionOptions")
            .field("action_name", &self.action_name)
            .field("log_input", &self.logs_input())
            .finish()
    }
}

/// A handler bundled with its logging behaviour. Built by [`action_wrapper`].
pub struct Action<F, I> {
    name: String,
    input_encoder: Option<InputEncoder<I>>,
    logger: Logger,
    handler: F,
}

/// Wraps `handler` so that calling it always yields an [`ActionResult`].
///
/// The action name is `options.action_name` if set, otherwise the handler's
/// function name, otherwise [`ANONYMOUS_ACTION`].
pub fn action_wrapper<F, I, Fut, T, E>(
    logger: &Logger,
    handler: F,
    options: ActionOptions<I>,
) -> Action<F, I>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Fault>,
{
    let name = options
        .action_name
        .filter(|name| !name.is_empty())
        .or_else(handler_name::<F>)
        .unwrap_or_else(|| ANONYMOUS_ACTION.to_string());

    Action {
        name,
        input_encoder: options.input_encoder,
        logger: logger.clone(),
        handler,
    }
}

/// Last path segment of a function item's type name. Closures have no name.
fn handler_name<F>() -> Option<String> {
    let full = type_name::<F>();
    if full.contains("{{closure}}") || full.contains('<') {
        return None;
    }
    full.rsplit("::")
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

impl<F, I, Fut, T, E> Action<F, I>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Fault>,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call(&self, input: I) -> ActionResult<T> {
        let logged_input = self.input_encoder.map(|encode| {
            let value = encode(&input);
            self.logger.debug(
                format!("[{}] Input", self.name),
                Some(log_context! { "input" => value }),
            );
            value
        });

        let outcome = AssertUnwindSafe(async { (self.handler)(input).await })
            .catch_unwind()
            .await;

        let fault = match outcome {
            Ok(Ok(data)) => {
                self.logger.debug(format!("[{}] Success", self.name), None);
                return ActionResult::Success(data);
            }
            Ok(Err(error)) => error.into(),
            Err(panic) => Fault::from_panic(panic),
        };

        let mut context = LogContext::new();
        if let Some(input) = logged_input {
            context.insert("input".to_string(), input);
        }
        self.logger
            .error(format!("[{}] Error", self.name), Some(&fault), Some(context));

        ActionResult::Failure(to_action_error(&fault))
    }
}
