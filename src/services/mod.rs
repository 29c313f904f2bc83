//! Services consumed by the request guards

pub mod token;

pub use token::{JwtClaims, JwtVerifier, TokenError, TokenVerifier};
