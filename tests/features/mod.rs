//! BDD scenarios for the request authorization pipeline


pub use support::TestWorld;
