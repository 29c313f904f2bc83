//! Authentication middleware
//!
//! Resolves the caller identity from an ordered list of strategies. The
//! first strategy that recognises the request decides it: a resolved user
//! wins, a hard rejection ends the request. When no strategy applies the
//! caller has presented no credentials at all.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    config::AuthConfig,
    models::{AuthenticatedUser, Role},
    services::{JwtVerifier, TokenVerifier},
    utils::AppError,
    AppState,
};

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_ROLE: &str = "x-user-role";
pub const HEADER_TOKEN_VERSION: &str = "x-token-version";
pub const HEADER_USER_NAME: &str = "x-user-name";
pub const HEADER_USER_SURNAME: &str = "x-user-surname";
pub const HEADER_BRANCH_ID: &str = "x-branch-id";

/// Result of one authentication strategy
#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated(AuthenticatedUser),
    /// The request carries nothing this strategy understands
    NotApplicable,
    Rejected(AppError),
}

/// One way of establishing who is calling
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome;
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn decoded_header(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name).map(|raw| {
        urlencoding::decode(raw)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    })
}

/// Identity asserted by the edge proxy through `x-user-*` headers
///
/// Only meaningful when the edge strips these headers from client traffic.
#[derive(Debug, Clone, Default)]
pub struct TrustedHeaders;

impl AuthStrategy for TrustedHeaders {
    fn name(&self) -> &'static str {
        "trusted_headers"
    }

    fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let (Some(id), Some(role)) = (
            header_str(headers, HEADER_USER_ID),
            header_str(headers, HEADER_USER_ROLE),
        ) else {
            return AuthOutcome::NotApplicable;
        };

        let token_version = header_str(headers, HEADER_TOKEN_VERSION)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        let mut user = AuthenticatedUser::new(id, Role::parse(role)).with_token_version(token_version);
        user.name = decoded_header(headers, HEADER_USER_NAME);
        user.surname = decoded_header(headers, HEADER_USER_SURNAME);
        user.branch_id = header_str(headers, HEADER_BRANCH_ID).map(str::to_string);

        AuthOutcome::Authenticated(user)
    }
}

/// Extract the token from an `Authorization` value
///
/// The scheme is matched case-insensitively; the token must be a single
/// non-empty word.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// `Authorization: Bearer <token>` checked by a [`TokenVerifier`]
#[derive(Clone)]
pub struct BearerToken {
    verifier: Arc<dyn TokenVerifier>,
}

impl BearerToken {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl AuthStrategy for BearerToken {
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return AuthOutcome::NotApplicable;
        };

        let Some(token) = value.to_str().ok().and_then(parse_bearer) else {
            return AuthOutcome::Rejected(AppError::MissingCredentials);
        };

        match self.verifier.verify(token) {
            Ok(claims) => AuthOutcome::Authenticated(claims.into()),
            Err(e) => {
                debug!(reason = %e, "Bearer token rejected");
                AuthOutcome::Rejected(AppError::InvalidOrExpiredToken)
            }
        }
    }
}

/// Ordered authentication strategies
#[derive(Clone)]
pub struct Authenticator {
    strategies: Vec<Arc<dyn AuthStrategy>>,
}

impl Authenticator {
    pub fn new(strategies: Vec<Arc<dyn AuthStrategy>>) -> Self {
        Self { strategies }
    }

    /// Trusted headers first (when enabled), then bearer tokens
    pub fn from_config(config: &AuthConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        let mut strategies: Vec<Arc<dyn AuthStrategy>> = Vec::new();
        if config.trust_identity_headers {
            strategies.push(Arc::new(TrustedHeaders));
        }
        strategies.push(Arc::new(BearerToken::new(verifier)));
        Self::new(strategies)
    }

    pub fn with_jwt_secret(config: &AuthConfig) -> Self {
        Self::from_config(config, Arc::new(JwtVerifier::new(&config.jwt_secret)))
    }

    /// Resolve the caller, or `None` when no credentials were presented
    pub fn try_authenticate(&self, headers: &HeaderMap) -> Result<Option<AuthenticatedUser>, AppError> {
        for strategy in &self.strategies {
            match strategy.authenticate(headers) {
                AuthOutcome::Authenticated(user) => {
                    debug!(strategy = strategy.name(), user_id = %user.id, role = %user.role, "Caller authenticated");
                    return Ok(Some(user));
                }
                AuthOutcome::Rejected(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Authentication rejected");
                    return Err(e);
                }
                AuthOutcome::NotApplicable => continue,
            }
        }
        Ok(None)
    }

    /// Resolve the caller, treating absent credentials as a 401
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
        self.try_authenticate(headers)?
            .ok_or(AppError::MissingCredentials)
    }
}

/// Extractor for AuthenticatedUser from request extensions
///
/// Lets handlers take the caller as a parameter once the auth middleware has run.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Authentication middleware
///
/// On success the resolved user is stored in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state.authenticator.authenticate(request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// Like [`auth_middleware`] but lets callers without credentials through
/// anonymously. Credentials that are presented and fail still reject.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(user) = state.authenticator.try_authenticate(request.headers())? {
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}
