//! Homework API endpoints

use axum::{extract::Path, routing::put, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    middleware::{protect, GuardSpec, RequestFacts},
    models::{AuditAction, AuthenticatedUser, OwnershipContext, Role},
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/{homeworkId}/submission",
        protect(
            state,
            GuardSpec::new()
                .roles([Role::Student, Role::Admin])
                .ownership(student_from_body)
                .audit_with(AuditAction::Update, homework_metadata),
            put(submit_homework),
        ),
    )
}

fn student_from_body(facts: &RequestFacts) -> OwnershipContext {
    OwnershipContext {
        student_id: facts.body_field("studentId"),
        ..Default::default()
    }
}

fn homework_metadata(facts: &RequestFacts) -> Map<String, Value> {
    let mut metadata = Map::new();
    if let Some(id) = facts.path_param("homeworkId") {
        metadata.insert("homeworkId".to_string(), Value::String(id));
    }
    metadata
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitHomeworkRequest {
    pub student_id: serde_json::Value,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub homework_id: String,
    pub student_id: String,
    pub status: &'static str,
    pub submitted_by: String,
}

async fn submit_homework(
    caller: AuthenticatedUser,
    Path(homework_id): Path<String>,
    Json(payload): Json<SubmitHomeworkRequest>,
) -> Json<SubmissionResponse> {
    let student_id = match payload.student_id {
        Value::String(s) => s,
        other => other.to_string(),
    };

    Json(SubmissionResponse {
        homework_id,
        student_id,
        status: "SUBMITTED",
        submitted_by: caller.id,
    })
}
