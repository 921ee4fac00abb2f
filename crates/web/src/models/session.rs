//! Session-related types.
//!
//! Keys for data stored in the signed session cookie.

/// Session keys for authentication and per-user UI state.
pub mod keys {
    /// Key for the platform access token of the signed-in user.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the set of community channels the user has joined.
    pub const JOINED_CHANNELS: &str = "joined_channels";
}
