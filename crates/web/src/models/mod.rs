//! Domain models for the web application.

pub mod identity;
pub mod session;

pub use identity::{Identity, SessionState};
