//! Audit middleware
//!
//! Records successful mutating calls after the handler has produced its
//! response. The write happens on a detached task; its outcome never reaches
//! the caller.

use std::{fmt, sync::Arc};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::request::{client_ip, request_path, RequestFacts, UNKNOWN_CLIENT};
use crate::{
    db::AuditSink,
    models::{is_mutating, AuditAction, AuditLogEntry, AuthenticatedUser},
};

/// Route-supplied function producing free-form audit metadata
pub type MetadataExtractor = Arc<dyn Fn(&RequestFacts) -> Map<String, Value> + Send + Sync>;

/// Layer state for one route's audit guard
#[derive(Clone)]
pub struct AuditGuard {
    pub sink: Arc<dyn AuditSink>,
    pub action: AuditAction,
    pub metadata: Option<MetadataExtractor>,
    /// Global switch; when off the guard only forwards
    pub enabled: bool,
}

impl fmt::Debug for AuditGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditGuard")
            .field("action", &self.action)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Write an entry on a detached task, logging failures only
pub fn record_detached(sink: Arc<dyn AuditSink>, entry: AuditLogEntry) {
    tokio::spawn(async move {
        match sink.record(&entry).await {
            Ok(()) => debug!(route = %entry.route, action = %entry.action, "Audit entry recorded"),
            Err(e) => warn!(
                error = %e,
                route = %entry.route,
                action = %entry.action,
                "Failed to record audit entry"
            ),
        }
    });
}

/// Audit middleware
///
/// Runs the handler first. Only a 2xx response to POST, PUT, PATCH or
/// DELETE produces an entry. Never rejects: a body it cannot inspect is
/// simply left out of the metadata.
pub async fn audit_middleware(
    State(guard): State<AuditGuard>,
    request: Request,
    next: Next,
) -> Response {
    if !guard.enabled || !is_mutating(request.method()) {
        return next.run(request).await;
    }

    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.id.clone());
    let route = request_path(&request);
    let ip = client_ip(&request);
    let ip_address = (ip != UNKNOWN_CLIENT).then_some(ip);

    let (metadata, request) = match &guard.metadata {
        None => (Map::new(), request),
        Some(extract) => match request.extensions().get::<RequestFacts>().cloned() {
            Some(facts) => (extract(&facts), request),
            None => {
                let (facts, request) = RequestFacts::observe(request).await;
                (extract(&facts), request)
            }
        },
    };

    let response = next.run(request).await;

    if response.status().is_success() {
        let entry = AuditLogEntry::new(user_id, route, &guard.action, ip_address, metadata);
        record_detached(guard.sink.clone(), entry);
    }

    response
}
