use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::context::AppContext;

/// Health check endpoint
///
/// Returns the current status of the API, the timestamp, the runtime
/// environment, and whether the database answers.
#[get("/health")]
pub async fn health(ctx: web::Data<AppContext>) -> impl Responder {
    let database = if ctx.db.ping().await {
        "ok"
    } else {
        "unavailable"
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "environment": ctx.config.environment,
        "database": database
    }))
}
