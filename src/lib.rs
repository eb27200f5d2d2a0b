#![doc = "The `planboard` library crate."]
#![doc = ""]
#![doc = "Typed environment configuration, a structured logger, the error taxonomy,"]
#![doc = "the action wrapper that turns handler outcomes into uniform results, and the"]
#![doc = "users/projects/tasks data model with its seed data. The `planboard` binary"]
#![doc = "serves the HTTP API; the `seed` binary resets the database to demo data."]

pub mod action;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;

pub use crate::action::{action_wrapper, ActionOptions, ActionResult};
pub use crate::error::{AppError, Fault};
