//! Exam API endpoints

use axum::{extract::Path, http::StatusCode, routing::delete, Router};
use tracing::info;

use crate::{
    middleware::{protect, GuardSpec, RequestFacts},
    models::{AuditAction, AuthenticatedUser, OwnershipContext, Role},
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/{examId}",
        protect(
            state,
            GuardSpec::new()
                .roles([Role::Admin, Role::Teacher])
                .ownership(class_from_query)
                .audit(AuditAction::Delete),
            delete(delete_exam),
        ),
    )
}

fn class_from_query(facts: &RequestFacts) -> OwnershipContext {
    OwnershipContext {
        class_id: facts.query_param("classId"),
        subject_id: facts.query_param("subjectId"),
        ..Default::default()
    }
}

async fn delete_exam(caller: AuthenticatedUser, Path(exam_id): Path<String>) -> StatusCode {
    info!(exam_id = %exam_id, user_id = %caller.id, "Exam deleted");
    StatusCode::NO_CONTENT
}
