//! Resolved user identity.

use plateful_core::{Email, Role, UserId};
use serde::{Deserialize, Serialize};

/// Identity of a signed-in user.
///
/// Produced by the session resolver from the session's access token.
/// Read-only to handlers; valid until sign-out or token expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Platform user ID (also the profile row's primary key).
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role from the user's profile record.
    pub role: Role,
}

/// Authentication state resolved for the current request.
///
/// Never "unknown": resolution either yields an identity or is explicitly
/// unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Identity),
}

impl SessionState {
    /// The resolved identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    /// The resolved role, if any.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated(identity) => Some(identity.role),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new(),
            email: Email::parse("user@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn unauthenticated_has_no_identity() {
        let state = SessionState::Unauthenticated;
        assert!(state.identity().is_none());
        assert!(state.role().is_none());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn authenticated_exposes_role() {
        let state = SessionState::Authenticated(identity(Role::Customer));
        assert_eq!(state.role(), Some(Role::Customer));
        assert!(state.is_authenticated());
    }
}
