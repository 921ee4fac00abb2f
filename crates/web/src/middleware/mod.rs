//! HTTP middleware stack for the web application.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//!
//! Role guards are extractors rather than layers: each protected handler
//! names the role it requires in its signature.

pub mod guard;
pub mod request_id;
pub mod session;

pub use guard::{
    home_path, CurrentUser, GuardOutcome, OptionalIdentity, RequireCustomer, RequireOwner,
};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
