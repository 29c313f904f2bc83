//! Role allow-list middleware
//!
//! Each protected route declares the roles that may call it. Role names are
//! normalised to uppercase on both sides before comparison.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    models::{AuthenticatedUser, Role},
    utils::AppError,
};

/// Roles permitted on a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireRoles {
    roles: Vec<Role>,
}

impl RequireRoles {
    pub fn new<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        Self {
            roles: roles.into_iter().map(|r| r.into().normalized()).collect(),
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn permits(&self, role: &Role) -> bool {
        self.roles.contains(&role.normalized())
    }
}

/// Check the caller's role against the allow-list
pub fn check_role(allowed: &RequireRoles, user: Option<&AuthenticatedUser>) -> Result<(), AppError> {
    let user = user.ok_or(AppError::Unauthorized)?;
    if allowed.permits(&user.role) {
        Ok(())
    } else {
        debug!(user_id = %user.id, role = %user.role, "Role not permitted on route");
        Err(AppError::RoleNotPermitted)
    }
}

/// Middleware enforcing a route's role allow-list
///
/// Must run after authentication; a request without a resolved user is a 401.
pub async fn require_roles_middleware(
    State(allowed): State<RequireRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_role(&allowed, request.extensions().get::<AuthenticatedUser>())?;
    Ok(next.run(request).await)
}
