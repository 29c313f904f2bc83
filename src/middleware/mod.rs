//! Middleware components
//!
//! This module contains the request guards, outermost first:
//! - Rate limiting (fixed window per client and route)
//! - Authentication (trusted edge headers or bearer JWT)
//! - Authorization (role allow-lists)
//! - Resource ownership
//! - Audit logging
//!
//! [`guards::protect`] composes them for a route.

pub mod audit;
pub mod auth;
pub mod guards;
pub mod ownership;
pub mod rate_limit;
pub mod rbac;
pub mod request;

pub use auth::{auth_middleware, optional_auth_middleware, Authenticator};
pub use guards::{protect, GuardSpec};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use request::RequestFacts;
