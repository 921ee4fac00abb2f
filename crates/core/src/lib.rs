//! Plateful Core - Shared types library.
//!
//! This crate provides common types used across all Plateful components:
//! - `web` - The restaurant discovery and management site
//! - `cli` - Command-line tools for operational tasks
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no backend
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
