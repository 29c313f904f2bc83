//! Student API endpoints

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::{protect, GuardSpec, RequestFacts},
    models::{AuditAction, AuthenticatedUser, OwnershipContext, Role},
    utils::AppError,
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            protect(
                state,
                GuardSpec::new()
                    .roles([Role::Admin, Role::Teacher])
                    .ownership(class_from_body)
                    .audit(AuditAction::Create),
                post(create_student),
            ),
        )
        .route(
            "/{studentId}",
            protect(
                state,
                GuardSpec::new()
                    .roles([Role::Admin, Role::Teacher, Role::Student, Role::Parent])
                    .ownership(student_from_path),
                get(get_student),
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

/// Student id from the path; teachers also name the class in the query
fn student_from_path(facts: &RequestFacts) -> OwnershipContext {
    OwnershipContext {
        student_id: facts.path_param("studentId"),
        class_id: facts.query_param("classId"),
        ..Default::default()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub surname: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    pub requested_by: String,
}

async fn create_student(
    caller: AuthenticatedUser,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentResponse>), AppError> {
    payload.validate()?;

    Ok((
        StatusCode::CREATED,
        Json(StudentResponse {
            id: Uuid::new_v4().to_string(),
            name: Some(payload.name),
            surname: Some(payload.surname),
            requested_by: caller.id,
        }),
    ))
}

async fn get_student(
    caller: AuthenticatedUser,
    Path(student_id): Path<String>,
) -> Json<StudentResponse> {
    Json(StudentResponse {
        id: student_id,
        name: None,
        surname: None,
        requested_by: caller.id,
    })
}
