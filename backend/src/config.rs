use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use sqlx::sqlite::SqliteConnectOptions;

/// Runtime configuration. Every flag also reads a `USER_SERVICE_*`
/// environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "user-management-service")]
#[command(version)]
#[command(about = "Deliberately vulnerable user lookup service", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "USER_SERVICE_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// SQLite file holding the `users` table
    #[arg(long, env = "USER_SERVICE_DATABASE", default_value = "users.db")]
    pub database: PathBuf,

    /// Fixed seed for the token generator
    #[arg(long, env = "USER_SERVICE_TOKEN_SEED")]
    pub token_seed: Option<u64>,

    /// Create the `users` table and demo rows before serving
    #[arg(long, env = "USER_SERVICE_INIT_DB")]
    pub init_db: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "USER_SERVICE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Connection settings for the users database. The file must already
    /// exist unless `--init-db` creates it.
    pub fn db_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new().filename(&self.database)
    }
}
