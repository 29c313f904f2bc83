//! Data models

mod audit;
mod ownership;
mod user;

pub use audit::*;
pub use ownership::*;
pub use user::*;
