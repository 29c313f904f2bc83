//! Declarative guard composition
//!
//! Routes describe the guards they need with a [`GuardSpec`] and hand it to
//! [`protect`], which wraps the route in the fixed order
//! rate limit, authentication, roles, ownership, audit, handler.
//!
//! ```ignore
//! let route = protect(
//!     &state,
//!     GuardSpec::new()
//!         .roles([Role::Admin, Role::Teacher])
//!         .ownership(|facts| OwnershipContext {
//!             class_id: facts.body_field("classId"),
//!             ..Default::default()
//!         })
//!         .audit(AuditAction::Create),
//!     post(create_student),
//! );
//! ```

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::MethodRouter};
use serde_json::{Map, Value};

use super::{
    audit::{audit_middleware, AuditGuard, MetadataExtractor},
    auth::{auth_middleware, optional_auth_middleware},
    ownership::{ownership_middleware, OwnershipExtractor, OwnershipGuard},
    rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimitGuard},
    rbac::{require_roles_middleware, RequireRoles},
    request::RequestFacts,
};
use crate::{
    models::{AuditAction, OwnershipContext, OwnershipPolicy, Role},
    AppState,
};

#[derive(Clone, Copy, Default)]
enum RateLimitChoice {
    /// Use the application-wide limit, if one is configured
    #[default]
    Inherit,
    Disabled,
}

/// Guards requested by one route
#[derive(Clone, Default)]
pub struct GuardSpec {
    rate_limit: Option<RateLimitConfig>,
    rate_limit_choice: RateLimitChoice,
    roles: Option<RequireRoles>,
    ownership: Option<(OwnershipExtractor, OwnershipPolicy)>,
    audit: Option<(AuditAction, Option<MetadataExtractor>)>,
    allow_anonymous: bool,
}

impl GuardSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route-specific limit replacing the application-wide one
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit = None;
        self.rate_limit_choice = RateLimitChoice::Disabled;
        self
    }

    pub fn roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles = Some(RequireRoles::new(roles));
        self
    }

    /// Ownership check with the default (strict) policy
    pub fn ownership<F>(self, extractor: F) -> Self
    where
        F: Fn(&RequestFacts) -> OwnershipContext + Send + Sync + 'static,
    {
        self.ownership_with_policy(extractor, OwnershipPolicy::default())
    }

    pub fn ownership_with_policy<F>(mut self, extractor: F, policy: OwnershipPolicy) -> Self
    where
        F: Fn(&RequestFacts) -> OwnershipContext + Send + Sync + 'static,
    {
        self.ownership = Some((Arc::new(extractor), policy));
        self
    }

    pub fn audit(mut self, action: AuditAction) -> Self {
        self.audit = Some((action, None));
        self
    }

    pub fn audit_with<F>(mut self, action: AuditAction, metadata: F) -> Self
    where
        F: Fn(&RequestFacts) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.audit = Some((action, Some(Arc::new(metadata))));
        self
    }

    /// Let callers without credentials through; presented credentials are still checked
    pub fn allow_anonymous(mut self) -> Self {
        self.allow_anonymous = true;
        self
    }

    fn effective_rate_limit(&self, state: &AppState) -> Option<RateLimitConfig> {
        match (&self.rate_limit, self.rate_limit_choice) {
            (Some(config), _) => Some(config.clone()),
            (None, RateLimitChoice::Disabled) => None,
            (None, RateLimitChoice::Inherit) => state.default_rate_limit.clone(),
        }
    }
}

/// Wrap a route in the guards described by `spec`
///
/// Layers are added innermost first, so the last one added runs first.
pub fn protect(
    state: &AppState,
    spec: GuardSpec,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let rate_limit = spec.effective_rate_limit(state);
    let mut route = route;

    if let Some((action, metadata)) = spec.audit {
        let guard = AuditGuard {
            sink: state.audit_sink.clone(),
            action,
            metadata,
            enabled: state.config.audit.enabled,
        };
        route = route.layer(from_fn_with_state(guard, audit_middleware));
    }

    if let Some((extractor, policy)) = spec.ownership {
        let guard = OwnershipGuard {
            store: state.ownership_store.clone(),
            extractor,
            policy,
        };
        route = route.layer(from_fn_with_state(guard, ownership_middleware));
    }

    if let Some(roles) = spec.roles {
        route = route.layer(from_fn_with_state(roles, require_roles_middleware));
    }

    route = if spec.allow_anonymous {
        route.layer(from_fn_with_state(state.clone(), optional_auth_middleware))
    } else {
        route.layer(from_fn_with_state(state.clone(), auth_middleware))
    };

    // Fails closed unless rate_limit.fail_open is set: a broken counter store
    // answers 503 rather than letting unmetered traffic through.
    if let Some(config) = rate_limit {
        let guard = RateLimitGuard {
            limiter: state.rate_limiter.clone(),
            config,
            fail_open: state.config.rate_limit.fail_open,
        };
        route = route.layer(from_fn_with_state(guard, rate_limit_middleware));
    }

    route
}
