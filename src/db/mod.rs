//! Database layer
//!
//! Local storage for:
//! - Teaching assignments and parent-student links read by the ownership guard
//! - The audit trail of successful mutating requests

pub mod audit_repository;
pub mod migrations;
pub mod ownership_repository;

pub use audit_repository::{AuditRepository, AuditSink};
pub use ownership_repository::{OwnershipRepository, OwnershipStore};

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and bring the schema up to date
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .with_context(|| format!("Failed to connect to database at {}", config.url))?;

    migrations::run(&pool).await?;

    Ok(pool)
}
