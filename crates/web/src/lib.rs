//! Plateful web application library.
//!
//! The whole app lives here so integration tests can build the router
//! against a stand-in platform; the binary is a thin bootstrap around it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod supabase;
