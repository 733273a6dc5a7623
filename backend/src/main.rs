pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::error::AppError;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::parse();
    init_logging(&config.log_level);

    tracing::info!("Starting User Management Service...");

    if config.init_db {
        db::repo::init_database(&config.db_options()).await?;
        tracing::info!(database = %config.database.display(), "database initialized");
    }

    api::server::start_server(&config).await
}
