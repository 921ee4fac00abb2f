//! Access roles for authenticated users.

use serde::{Deserialize, Serialize};

/// The access class of an authenticated user.
///
/// Stored on the profile record as `user_type`. Route guards compare this
/// against the role a dashboard subtree requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses restaurants, posts social content, joins communities.
    Customer,
    /// Manages a restaurant: menu, orders, reservations, promotions.
    RestaurantOwner,
}

impl Role {
    /// Wire value as stored in the `user_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::RestaurantOwner => "restaurant_owner",
        }
    }

    #[must_use]
    pub const fn is_owner(self) -> bool {
        matches!(self, Self::RestaurantOwner)
    }

    #[must_use]
    pub const fn is_customer(self) -> bool {
        matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "restaurant_owner" => Ok(Self::RestaurantOwner),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(Role::Customer.as_str(), "customer");
        assert_eq!(Role::RestaurantOwner.as_str(), "restaurant_owner");
    }

    #[test]
    fn test_serde_matches_wire_values() {
        let json = serde_json::to_string(&Role::RestaurantOwner).unwrap();
        assert_eq!(json, "\"restaurant_owner\"");

        let parsed: Role = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(parsed, Role::Customer);
    }

    #[test]
    fn test_from_str_round_trip() {
        for role in [Role::Customer, Role::RestaurantOwner] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
