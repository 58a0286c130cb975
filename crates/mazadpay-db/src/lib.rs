//! MazadPay Database Layer
//!
//! PostgreSQL persistence for the payout clearance ledger.
//!
//! # Architecture
//!
//! Each engine port has one implementation here backed by a shared
//! connection pool. All transition queries are conditional UPDATEs guarded
//! on the expected prior status; a guard miss is surfaced as zero rows
//! affected, never absorbed by an unconditional write.

pub mod config;
pub mod error;
pub mod models;
pub mod stores;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;

use mazadpay_clearing::ClearanceEngine;

pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use models::*;
pub use stores::*;

/// Database connection pool
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("Connecting to PostgreSQL: {}", config.postgres_url_masked());

        let pool = PgPoolOptions::new()
            .max_connections(config.pg_max_connections)
            .min_connections(config.pg_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.pg_acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| DbError::Connection(format!("PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DbResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> DbResult<bool> {
        let ok = sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok();
        Ok(ok)
    }

    /// Create store instances
    pub fn permission_store(&self) -> PgPermissionStore {
        PgPermissionStore::new(self.pool.clone())
    }

    pub fn wallet_ledger(&self) -> PgWalletLedger {
        PgWalletLedger::new(self.pool.clone())
    }

    pub fn account_directory(&self) -> PgAccountDirectory {
        PgAccountDirectory::new(self.pool.clone())
    }

    pub fn notifier(&self) -> PgNotifier {
        PgNotifier::new(self.pool.clone())
    }

    /// Wire a clearance engine over this database.
    pub fn clearance_engine(&self) -> ClearanceEngine {
        ClearanceEngine::new(
            Arc::new(self.permission_store()),
            Arc::new(self.wallet_ledger()),
            Arc::new(self.account_directory()),
            Arc::new(self.notifier()),
        )
    }
}
