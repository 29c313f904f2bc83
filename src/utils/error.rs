//! Error types and handling
//!
//! Every guard rejection is an [`AppError`] variant with a fixed status code
//! and a stable message. All of them render the same JSON body:
//! `{ "error": <message> }`, plus `retryAfter` for rate-limit rejections.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// No trusted identity headers and no usable bearer token (401)
    #[error("Unauthorized: Bearer token required")]
    MissingCredentials,

    /// The token verifier rejected the bearer token (403)
    #[error("Forbidden: Invalid or expired token")]
    InvalidOrExpiredToken,

    /// A guard that needs an identity ran without one (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Role is not on the route's allow-list (403)
    #[error("Access denied")]
    RoleNotPermitted,

    /// A correlation id the ownership check needs is absent (400)
    #[error("{0}")]
    MissingOwnershipContext(&'static str),

    /// The caller has no relationship to the addressed resource (403)
    #[error("{0}")]
    OwnershipMismatch(&'static str),

    /// Request budget for this client and route is spent (429)
    #[error("{message}")]
    RateLimitExceeded {
        message: String,
        retry_after_secs: u64,
        limit: u32,
    },

    /// Request could not be read (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// A dependency the pipeline relies on is down (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidOrExpiredToken
            | AppError::RoleNotPermitted
            | AppError::OwnershipMismatch(_) => StatusCode::FORBIDDEN,
            AppError::MissingOwnershipContext(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show the caller; internal detail stays in the logs
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Seconds until the rate-limit window resets (429 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let should_log = matches!(
            self,
            AppError::Internal(_) | AppError::ServiceUnavailable(_)
        );

        if should_log {
            error!(error = %self, status = status.as_u16(), "Request error");
        }

        let body = ErrorResponse::new(self.public_message());

        match self {
            AppError::RateLimitExceeded {
                retry_after_secs,
                limit,
                ..
            } => {
                let mut response =
                    (status, Json(body.with_retry_after(retry_after_secs))).into_response();
                let headers = response.headers_mut();
                headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
                headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
                response
            }
            _ => (status, Json(body)).into_response(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
