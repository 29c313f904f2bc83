//! Test factories for credentials
//!
//! Builds bearer tokens and trusted-header identities for requests.

use axum::http::request::Builder;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use super::fixtures::TEST_JWT_SECRET;

/// How a test request identifies its caller
#[derive(Debug, Clone)]
pub enum AuthAs {
    Anonymous,
    /// `Authorization: Bearer <token>`
    Token(String),
    /// Raw `Authorization` header value
    RawAuthorization(String),
    /// Identity asserted by the edge through `x-user-*` headers
    Headers { id: String, role: String },
}

impl AuthAs {
    /// Valid bearer token for the given identity
    pub fn bearer(id: &str, role: &str) -> Self {
        AuthAs::Token(token_for(id, role))
    }

    pub fn headers(id: &str, role: &str) -> Self {
        AuthAs::Headers {
            id: id.to_string(),
            role: role.to_string(),
        }
    }

    pub fn apply(&self, builder: Builder) -> Builder {
        match self {
            AuthAs::Anonymous => builder,
            AuthAs::Token(token) => builder.header("Authorization", format!("Bearer {}", token)),
            AuthAs::RawAuthorization(value) => builder.header("Authorization", value.as_str()),
            AuthAs::Headers { id, role } => builder
                .header("x-user-id", id.as_str())
                .header("x-user-role", role.as_str()),
        }
    }
}

/// Sign a claim payload with an arbitrary secret
pub fn sign_claims(claims: serde_json::Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// Token for `id` and `role` valid for one hour
pub fn token_for(id: &str, role: &str) -> String {
    let now = Utc::now();
    sign_claims(
        json!({
            "id": id,
            "role": role,
            "tokenVersion": 1,
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp(),
        }),
        TEST_JWT_SECRET,
    )
}

/// Token that expired an hour ago
pub fn expired_token_for(id: &str, role: &str) -> String {
    let now = Utc::now();
    sign_claims(
        json!({
            "id": id,
            "role": role,
            "iat": (now - Duration::hours(2)).timestamp(),
            "exp": (now - Duration::hours(1)).timestamp(),
        }),
        TEST_JWT_SECRET,
    )
}

/// Well-formed token signed with the wrong key
pub fn forged_token_for(id: &str, role: &str) -> String {
    let now = Utc::now();
    sign_claims(
        json!({
            "id": id,
            "role": role,
            "exp": (now + Duration::hours(1)).timestamp(),
        }),
        "some_other_secret_that_is_also_32_bytes_long",
    )
}
