//! Staff reporting endpoints
//!
//! Open to HR roles, which carry no ownership notion; the role list is the
//! only gate here.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::{
    middleware::{protect, GuardSpec},
    models::{AuthenticatedUser, Role},
    AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/reports",
        protect(
            state,
            GuardSpec::new().roles([Role::Admin, Role::parse("HR_MANAGER")]),
            get(staff_reports),
        ),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffReportIndex {
    pub reports: Vec<&'static str>,
    pub requested_by: String,
    pub branch_id: Option<String>,
}

async fn staff_reports(caller: AuthenticatedUser) -> Json<StaffReportIndex> {
    Json(StaffReportIndex {
        reports: vec!["headcount", "leave-balance", "payroll-summary"],
        requested_by: caller.id,
        branch_id: caller.branch_id,
    })
}
