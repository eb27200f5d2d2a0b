//! Resets the database to the demo data set.
//!
//! Exits with status 1 if configuration, connection, migration or seeding
//! fails. The connection is closed either way.

use std::process;
use planboard::{config::ConfigLoader, context::AppContext, error::Fault, logger, seed};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match ConfigLoader::from_process_env().get() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };
    logger::init(config.environment);

    let ctx = match AppContext::connect(config).await {
        Ok(ctx) => ctx,
        Err(err) => {
            log::error!("Failed to connect to database: {}", err);
            process::exit(1);
        }
    };

    let outcome: Result<seed::SeedSummary, Fault> = async {
        ctx.db.migrate().await?;
        Ok::<_, Fault>(seed::run(&ctx.db, &ctx.logger).await?)
    }
    .await;

    let failed = match outcome {
        Ok(_) => false,
        Err(fault) => {
            ctx.logger.error("Seed failed", Some(&fault), None);
            true
        }
    };

    ctx.shutdown().await;

    if failed {
        process::exit(1);
    }
}
