pub mod health;
pub mod projects;
pub mod tasks;

use std::sync::Arc;

use actix_web::web;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::{RateLimit, RateLimiter};

/// Registers the JSON API routes (mounted under `/api`).
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string(), None).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string(), None).into()),
    )
    .service(projects::list_projects)
    .service(projects::create_project)
    .service(projects::get_project)
    .service(tasks::list_tasks)
    .service(tasks::create_task);
}

/// Registers the whole application: shared context, health check, and the
/// rate-limited `/api` scope.
pub fn app(
    ctx: web::Data<AppContext>,
    limiter: Arc<RateLimiter>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let logger = ctx.logger.clone();
        cfg.app_data(ctx).service(health::health).service(
            web::scope("/api")
                .wrap(RateLimit::new(limiter, logger))
                .configure(config),
        );
    }
}
