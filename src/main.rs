//! Stockroom - inventory server with session-bound token authentication

use stockroom::{api, core, db};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Placeholder secret shipped in the defaults
const DEFAULT_SECRET: &str = "change-this-secret-in-production";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting Stockroom v{}", stockroom::VERSION);
    info!(
        host = %config.server.host,
        port = config.server.port,
        mode = %config.server.mode,
        "Server configuration"
    );

    if config.security.jwt_secret == DEFAULT_SECRET {
        if config.server.is_production() {
            anyhow::bail!("security.jwt_secret must be set in production mode");
        }
        warn!("Using the default signing secret; set STOCKROOM_SECURITY__JWT_SECRET");
    }

    info!(path = ?config.database.path, "Initializing database...");
    let db = Arc::new(db::DatabaseManager::new(
        &config.database.path,
        config.database.connection_pool_size as u32,
        Duration::from_millis(config.database.busy_timeout),
    )?);
    info!("Database initialized successfully");

    let server = api::ApiServer::new(&config, db)?;
    info!(
        url = %format!("http://{}:{}", config.server.host, config.server.port),
        "Server ready - starting to serve requests"
    );

    // Blocks until shutdown signal
    server.serve().await?;

    Ok(())
}
