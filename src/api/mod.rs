//! API routes and handlers
//!
//! This module defines all API endpoints and their routing. Every route
//! outside `/api/health` is wrapped by [`crate::middleware::protect`].

use axum::{routing::get, Router};

use crate::AppState;

mod attendance;
mod audit_logs;
mod exams;
mod health;
mod homework;
mod parents;
mod staff;
mod students;

pub use health::*;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
}

/// Protected API routes, each carrying its own guards
pub fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/students", students::routes(state))
        .nest("/attendance", attendance::routes(state))
        .nest("/homework", homework::routes(state))
        .nest("/parents", parents::routes(state))
        .nest("/exams", exams::routes(state))
        .nest("/staff", staff::routes(state))
        .nest("/audit-logs", audit_logs::routes(state))
}

/// Full application router under `/api`
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", public_routes().merge(protected_routes(&state)))
        .with_state(state)
}
