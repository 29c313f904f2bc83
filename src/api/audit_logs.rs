//! Audit log API endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::{
    db::AuditRepository,
    middleware::{protect, GuardSpec},
    models::{AuditLogEntry, AuditLogQuery, Role},
    utils::AppError,
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/",
        protect(
            state,
            GuardSpec::new().roles([Role::Admin]),
            get(list_audit_logs),
        ),
    )
}

async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    let repo = AuditRepository::new(state.db.clone());
    let logs = repo.list(&query).await.map_err(|e| {
        tracing::error!("Failed to list audit logs: {}", e);
        AppError::internal("Failed to list audit logs")
    })?;

    Ok(Json(logs))
}
