//! Parent portal endpoints

use axum::{extract::Path, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    middleware::{protect, GuardSpec, RequestFacts},
    models::{AuthenticatedUser, OwnershipContext, Role},
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/children/{studentId}",
        protect(
            state,
            GuardSpec::new()
                .roles([Role::Parent, Role::Admin])
                .ownership(|facts: &RequestFacts| OwnershipContext {
                    student_id: facts.path_param("studentId"),
                    ..Default::default()
                }),
            get(get_child_overview),
        ),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildOverview {
    pub student_id: String,
    pub viewer_id: String,
    pub viewer_role: String,
}

async fn get_child_overview(
    caller: AuthenticatedUser,
    Path(student_id): Path<String>,
) -> Json<ChildOverview> {
    Json(ChildOverview {
        student_id,
        viewer_id: caller.id,
        viewer_role: caller.role.to_string(),
    })
}
