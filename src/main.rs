use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger as RequestLogger, web, App, HttpServer};

use planboard::{
    config::ConfigLoader, context::AppContext, log_context, logger, middleware::RateLimiter, routes,
};

fn to_io_error<E: std::fmt::Display>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    let config = ConfigLoader::from_process_env()
        .get()
        .map_err(to_io_error)?;
    logger::init(config.environment);

    let ctx = AppContext::connect(Arc::clone(&config))
        .await
        .map_err(to_io_error)?;
    ctx.db.migrate().await.map_err(to_io_error)?;

    let limiter = Arc::new(RateLimiter::from_config(&config));
    let data = web::Data::new(ctx.clone());
    let origin = config.app_url.trim_end_matches('/').to_string();

    ctx.logger.info(
        "Starting server",
        Some(log_context! {
            "url" => config.server_url(),
            "environment" => config.environment,
        }),
    );

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&origin)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(RequestLogger::default())
            .wrap(cors)
            .configure(routes::app(data.clone(), Arc::clone(&limiter)))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await;

    ctx.shutdown().await;
    server
}
