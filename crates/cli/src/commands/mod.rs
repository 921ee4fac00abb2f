//! CLI command implementations.

pub mod account;
pub mod check;
pub mod seed;
