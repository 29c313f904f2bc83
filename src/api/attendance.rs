//! Attendance API endpoints

use axum::{http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::{
    middleware::{protect, GuardSpec, RequestFacts},
    models::{AuditAction, AuthenticatedUser, OwnershipContext, Role},
    utils::AppError,
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/",
        protect(
            state,
            GuardSpec::new()
                .roles([Role::Admin, Role::Teacher])
                .ownership(class_from_body)
                .audit_with(AuditAction::Create, attendance_metadata),
            post(mark_attendance),
        ),
    )
}

fn class_from_body(facts: &RequestFacts) -> OwnershipContext {
    OwnershipContext {
        class_id: facts.body_field("classId"),
        subject_id: facts.body_field("subjectId"),
        ..Default::default()
    }
}

fn attendance_metadata(facts: &RequestFacts) -> Map<String, Value> {
    let mut metadata = Map::new();
    for field in ["classId", "date"] {
        if let Some(value) = facts.body_field(field) {
            metadata.insert(field.to_string(), Value::String(value));
        }
    }
    metadata
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[validate(length(min = 1))]
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    #[validate(length(min = 1))]
    pub date: String,
    #[validate(length(min = 1), nested)]
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub date: String,
    pub recorded: usize,
    pub marked_by: String,
}

async fn mark_attendance(
    caller: AuthenticatedUser,
    Json(payload): Json<MarkAttendanceRequest>,
) -> Result<(StatusCode, Json<MarkAttendanceResponse>), AppError> {
    payload.validate()?;

    Ok((
        StatusCode::CREATED,
        Json(MarkAttendanceResponse {
            date: payload.date,
            recorded: payload.records.len(),
            marked_by: caller.id,
        }),
    ))
}
