//! Request inspection helpers shared by the guards
//!
//! Client address and route path resolution for rate limiting and audit,
//! plus [`RequestFacts`], a buffered snapshot of the parts of a request that
//! route-supplied extractors look at.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
};

use axum::{
    body::{self, Body, HttpBody},
    extract::{ConnectInfo, FromRequestParts, OriginalUri, Query, RawPathParams, Request},
    http::{header::CONTENT_LENGTH, request::Parts, HeaderMap, Method},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::utils::AppError;

/// Sentinel used when no client address can be resolved
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Largest body the guards will buffer for inspection
pub const MAX_INSPECTED_BODY_BYTES: usize = 1024 * 1024;

pub const BODY_TOO_LARGE: &str = "request body too large";
pub const BODY_UNREADABLE: &str = "request body could not be read";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Normalise an address string so one client maps to one key
///
/// IPv4-mapped IPv6 addresses collapse to IPv4 and an explicit port is
/// dropped. Anything that does not parse is kept as given.
fn normalize_ip(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Some(ip.to_canonical().to_string());
    }
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr.ip().to_canonical().to_string());
    }
    Some(raw.to_string())
}

/// Resolve the caller address from proxy headers alone
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(normalize_ip);

    forwarded.or_else(|| {
        headers
            .get(REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(normalize_ip)
    })
}

/// Resolve the caller address for a request
///
/// Order: first `x-forwarded-for` entry, `x-real-ip`, the socket peer when
/// the server was started with connect info, then [`UNKNOWN_CLIENT`].
pub fn client_ip<B>(request: &axum::http::Request<B>) -> String {
    forwarded_client_ip(request.headers())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Full path of the request as the client sent it, before any nesting
pub fn request_path<B>(request: &axum::http::Request<B>) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Body length from the body itself, else from `Content-Length`
fn declared_body_len(request: &Request) -> Option<u64> {
    request.body().size_hint().exact().or_else(|| {
        request
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Snapshot of a request used by ownership and audit extractors
///
/// Capturing buffers the body; the request handed back carries the same
/// bytes so the handler can still read it.
#[derive(Debug, Clone, Default)]
pub struct RequestFacts {
    method: Method,
    path: String,
    path_params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Value,
}

impl RequestFacts {
    /// Buffer and inspect a request, returning the facts and a rebuilt request
    ///
    /// Bodies over [`MAX_INSPECTED_BODY_BYTES`] or bodies that cannot be read
    /// are rejected with a fixed 400; the underlying error is only logged.
    pub async fn capture(request: Request) -> Result<(Self, Request), AppError> {
        if let Some(len) = declared_body_len(&request).filter(|len| *len > MAX_INSPECTED_BODY_BYTES as u64) {
            warn!(length = len, limit = MAX_INSPECTED_BODY_BYTES, "Request body too large to inspect");
            return Err(AppError::bad_request(BODY_TOO_LARGE));
        }

        let (mut facts, parts, body) = Self::split(request).await;
        let bytes = body::to_bytes(body, MAX_INSPECTED_BODY_BYTES)
            .await
            .map_err(|e| {
                warn!(error = %e, path = %facts.path, "Failed to buffer request body");
                AppError::bad_request(BODY_UNREADABLE)
            })?;

        facts.body = parse_body(&bytes);
        Ok((facts, Request::from_parts(parts, Body::from(bytes))))
    }

    /// Inspect a request without ever rejecting it
    ///
    /// Only bodies of known length within the cap are buffered. Anything
    /// else reaches the handler untouched and the facts carry a `Null` body.
    pub async fn observe(request: Request) -> (Self, Request) {
        let declared = declared_body_len(&request);
        let (mut facts, parts, body) = Self::split(request).await;

        match declared {
            Some(len) if len <= MAX_INSPECTED_BODY_BYTES as u64 => {
                match body::to_bytes(body, MAX_INSPECTED_BODY_BYTES).await {
                    Ok(bytes) => {
                        facts.body = parse_body(&bytes);
                        (facts, Request::from_parts(parts, Body::from(bytes)))
                    }
                    Err(e) => {
                        warn!(error = %e, path = %facts.path, "Failed to buffer request body");
                        (facts, Request::from_parts(parts, Body::empty()))
                    }
                }
            }
            Some(len) => {
                warn!(length = len, path = %facts.path, "Request body too large to inspect, skipping it");
                (facts, Request::from_parts(parts, body))
            }
            None => {
                debug!(path = %facts.path, "Request body of unknown length, skipping it");
                (facts, Request::from_parts(parts, body))
            }
        }
    }

    /// Facts from everything but the body
    async fn split(request: Request) -> (Self, Parts, Body) {
        let path = request_path(&request);
        let (mut parts, body) = request.into_parts();

        let path_params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let facts = Self {
            method: parts.method.clone(),
            path,
            path_params,
            query,
            body: Value::Null,
        };

        (facts, parts, body)
    }

    /// Build facts directly, mostly for exercising extractors in tests
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.path_params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_param(&self, name: &str) -> Option<String> {
        self.path_params.get(name).cloned()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).filter(|v| !v.is_empty()).cloned()
    }

    /// Top-level body field rendered as a string; numbers are accepted
    pub fn body_field(&self, name: &str) -> Option<String> {
        match self.body.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}
