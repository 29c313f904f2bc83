//! Resource ownership middleware
//!
//! Confirms the caller is the specific actor entitled to touch the addressed
//! resource, not just a holder of a permitted role. The checks are
//! role-dispatched:
//!
//! - ADMIN passes when the policy allows admin bypass.
//! - TEACHER needs an active assignment to the class (and subject, if given).
//! - STUDENT may only address their own id.
//! - PARENT needs a guardianship link to the student.
//!
//! Roles outside those four have no ownership notion and pass unchecked;
//! routes open to them must be guarded some other way.

use std::{fmt, sync::Arc};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use super::request::RequestFacts;
use crate::{
    db::OwnershipStore,
    models::{AuthenticatedUser, OwnershipContext, OwnershipPolicy, Role},
    utils::AppError,
};

pub const CLASS_ID_REQUIRED: &str = "ClassId required";
pub const TEACHER_NOT_ASSIGNED: &str = "Unauthorized to modify this record";
pub const STUDENT_NOT_SELF: &str = "Access to other student data is forbidden";
pub const STUDENT_ID_REQUIRED: &str = "studentId required";
pub const PARENT_NOT_LINKED: &str = "Access denied to this child data";

/// Route-supplied function pulling correlation ids out of a request
pub type OwnershipExtractor = Arc<dyn Fn(&RequestFacts) -> OwnershipContext + Send + Sync>;

/// Decide whether `user` may touch the resource described by `ctx`
///
/// Store failures are logged and reported as the same 403 a missing
/// relationship would produce.
pub async fn validate_ownership(
    store: &dyn OwnershipStore,
    user: &AuthenticatedUser,
    ctx: &OwnershipContext,
    policy: &OwnershipPolicy,
) -> Result<(), AppError> {
    match &user.role {
        Role::Admin if policy.allow_admin_bypass => Ok(()),
        Role::Teacher if policy.require_teacher_match => {
            let class_id = ctx
                .class_id
                .as_deref()
                .ok_or(AppError::MissingOwnershipContext(CLASS_ID_REQUIRED))?;

            match store
                .find_active_assignment(&user.id, class_id, ctx.subject_id.as_deref())
                .await
            {
                Ok(Some(_)) => Ok(()),
                Ok(None) => {
                    debug!(teacher_id = %user.id, class_id, subject_id = ?ctx.subject_id, "No active teaching assignment");
                    Err(AppError::OwnershipMismatch(TEACHER_NOT_ASSIGNED))
                }
                Err(e) => {
                    error!(error = %e, teacher_id = %user.id, class_id, "Teaching assignment lookup failed");
                    Err(AppError::OwnershipMismatch(TEACHER_NOT_ASSIGNED))
                }
            }
        }
        Role::Student if policy.require_student_self => {
            if ctx.student_id.as_deref() == Some(user.id.as_str()) {
                Ok(())
            } else {
                Err(AppError::OwnershipMismatch(STUDENT_NOT_SELF))
            }
        }
        Role::Parent => {
            let student_id = ctx
                .student_id
                .as_deref()
                .ok_or(AppError::MissingOwnershipContext(STUDENT_ID_REQUIRED))?;

            match store.find_parent_link(&user.id, student_id).await {
                Ok(Some(_)) => Ok(()),
                Ok(None) => {
                    debug!(parent_id = %user.id, student_id, "No parent-student link");
                    Err(AppError::OwnershipMismatch(PARENT_NOT_LINKED))
                }
                Err(e) => {
                    error!(error = %e, parent_id = %user.id, student_id, "Parent link lookup failed");
                    Err(AppError::OwnershipMismatch(PARENT_NOT_LINKED))
                }
            }
        }
        _ => Ok(()),
    }
}

/// Layer state for one route's ownership guard
#[derive(Clone)]
pub struct OwnershipGuard {
    pub store: Arc<dyn OwnershipStore>,
    pub extractor: OwnershipExtractor,
    pub policy: OwnershipPolicy,
}

impl fmt::Debug for OwnershipGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipGuard")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Ownership middleware
///
/// Captures the request facts, runs the route's extractor and validates the
/// result. The facts and the extracted context are left in the request
/// extensions for the audit guard and the handler.
pub async fn ownership_middleware(
    State(guard): State<OwnershipGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::Unauthorized)?;

    let (facts, mut request) = RequestFacts::capture(request).await?;
    let ctx = (guard.extractor)(&facts);

    validate_ownership(guard.store.as_ref(), &user, &ctx, &guard.policy).await?;

    request.extensions_mut().insert(facts);
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
