//! Core types for Plateful.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod feed;
pub mod id;
pub mod price;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use feed::FeedKind;
pub use id::*;
pub use price::Price;
pub use role::Role;
pub use status::{OrderStatus, ReservationStatus};
