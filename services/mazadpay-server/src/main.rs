//! MazadPay Clearance Server
//!
//! REST API and scheduled enforcement for the payout clearance ledger.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! mazadpay-server
//!
//! # Start with custom config
//! mazadpay-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! MAZADPAY__SERVER__PORT=8080 mazadpay-server
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mazadpay_api::{create_router, ApiConfig, AppState};
use mazadpay_clearing::sweep::{run_debt_enforcer, run_grace_sweeper};
use mazadpay_db::{Database, DatabaseConfig as DbConfig};

use crate::config::ServerConfig;

/// MazadPay Clearance Server - payout clearance ledger for the marketplace
#[derive(Parser, Debug)]
#[command(name = "mazadpay-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "MAZADPAY_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "MAZADPAY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MAZADPAY_PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Delivery partner API key
    #[arg(long, env = "DELIVERY_PARTNER_API_KEY")]
    partner_api_key: Option<String>,

    /// Admin API key
    #[arg(long, env = "ADMIN_API_KEY")]
    admin_api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MAZADPAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "MAZADPAY_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Enable development mode (relaxed key requirements, permissive CORS)
    #[arg(long, env = "MAZADPAY_DEV_MODE")]
    dev_mode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(db_url) = args.database_url {
        server_config.database.postgres_url = db_url;
    }
    if let Some(key) = args.partner_api_key {
        server_config.api.partner_api_key = Some(key);
    }
    if let Some(key) = args.admin_api_key {
        server_config.api.admin_api_key = Some(key);
    }
    if args.dev_mode {
        server_config.api.enable_cors = true;
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting MazadPay Clearance Server"
    );

    validate_config(&server_config, args.dev_mode)?;

    // Database
    let db = init_database(&server_config).await?;

    // Clearance engine and API state
    let engine = Arc::new(db.clearance_engine());
    let accounts = Arc::new(db.account_directory());
    let state = Arc::new(AppState::new(
        engine.clone(),
        accounts,
        ApiConfig {
            partner_api_key: server_config.api.partner_api_key.clone(),
            admin_api_key: server_config.api.admin_api_key.clone(),
            enable_cors: server_config.api.enable_cors,
        },
    ));

    // Background sweeps: hourly grace-period clearance, daily debt enforcement
    tokio::spawn(run_grace_sweeper(
        engine.clone(),
        server_config.sweep.grace_interval(),
    ));
    tokio::spawn(run_debt_enforcer(
        engine.clone(),
        server_config.sweep.debt_interval(),
    ));

    let app = create_router(state);
    let addr = server_config.server.socket_addr();

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().pretty().with_target(true)).init();
        }
    }

    Ok(())
}

/// Validate configuration
fn validate_config(config: &ServerConfig, dev_mode: bool) -> anyhow::Result<()> {
    if !dev_mode {
        if config.api.partner_api_key.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!(
                "Partner API key must be set in production. Set DELIVERY_PARTNER_API_KEY."
            );
        }
        if config.api.admin_api_key.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("Admin API key must be set in production. Set ADMIN_API_KEY.");
        }
    }
    Ok(())
}

/// Connect to the database and run migrations
async fn init_database(config: &ServerConfig) -> anyhow::Result<Database> {
    let db_config = DbConfig {
        postgres_url: config.database.postgres_url.clone(),
        pg_max_connections: config.database.max_connections,
        pg_min_connections: config.database.min_connections,
        pg_acquire_timeout_secs: config.database.connect_timeout_secs,
    };

    let db = Database::connect(&db_config).await?;

    if config.database.run_migrations {
        db.migrate().await?;
    }

    if !db.health_check().await? {
        anyhow::bail!("Database health check failed");
    }
    tracing::info!("Database health check passed");

    Ok(db)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["mazadpay-server", "--port", "8080"]);
        assert_eq!(args.port, Some(8080));
    }

    #[test]
    fn test_production_requires_keys() {
        let config = ServerConfig::default();
        assert!(validate_config(&config, false).is_err());
        assert!(validate_config(&config, true).is_ok());
    }
}
