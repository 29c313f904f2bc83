//! School Portal Library
//!
//! Request authorization pipeline for the school-management API: rate
//! limiting, authentication, role checks, resource ownership and audit
//! logging, composed per route.

use std::sync::Arc;

use anyhow::{Context, Result};

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, protect, Authenticator, GuardSpec};
pub use models::{AuthenticatedUser, Role};

use db::{AuditRepository, AuditSink, OwnershipRepository, OwnershipStore};
use middleware::{RateLimitConfig, RateLimiter};

/// Application state shared across handlers and guards
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Ordered authentication strategies
    pub authenticator: Authenticator,
    /// Fixed-window counters shared by every rate-limited route
    pub rate_limiter: RateLimiter,
    /// Limit applied to routes that do not set their own
    pub default_rate_limit: Option<RateLimitConfig>,
    /// Assignment and guardianship lookups
    pub ownership_store: Arc<dyn OwnershipStore>,
    /// Destination for audit entries
    pub audit_sink: Arc<dyn AuditSink>,
}

impl AppState {
    /// Build state backed by the database repositories and a JWT verifier
    pub fn new(config: AppConfig, db: DbPool) -> Result<Self> {
        let default_rate_limit = if config.rate_limit.enabled {
            Some(
                config
                    .rate_limit
                    .route_config()
                    .context("Invalid default rate limit")?,
            )
        } else {
            None
        };

        Ok(Self {
            authenticator: Authenticator::with_jwt_secret(&config.auth),
            rate_limiter: RateLimiter::new(config.rate_limit.max_tracked_keys),
            default_rate_limit,
            ownership_store: Arc::new(OwnershipRepository::new(db.clone())),
            audit_sink: Arc::new(AuditRepository::new(db.clone())),
            config,
            db,
        })
    }

    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_ownership_store(mut self, store: Arc<dyn OwnershipStore>) -> Self {
        self.ownership_store = store;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = limiter;
        self
    }
}
