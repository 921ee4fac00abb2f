//! Feed selection for the social home view.

use serde::{Deserialize, Serialize};

/// Which slice of the social feed a customer is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    /// Newest posts from everyone.
    #[default]
    ForYou,
    /// Posts ranked by like count.
    Trending,
    /// Posts from accounts the viewer follows.
    Following,
}

impl FeedKind {
    /// All feeds in tab order.
    pub const ALL: [Self; 3] = [Self::ForYou, Self::Trending, Self::Following];

    /// URL segment and cache-key value for this feed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ForYou => "for-you",
            Self::Trending => "trending",
            Self::Following => "following",
        }
    }

    /// Tab label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ForYou => "For You",
            Self::Trending => "Trending Now",
            Self::Following => "Following",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "for-you" => Ok(Self::ForYou),
            "trending" => Ok(Self::Trending),
            "following" => Ok(Self::Following),
            _ => Err(format!("invalid feed kind: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_values_round_trip() {
        for feed in FeedKind::ALL {
            let parsed: FeedKind = feed.as_str().parse().unwrap();
            assert_eq!(parsed, feed);
        }
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&FeedKind::ForYou).unwrap();
        assert_eq!(json, "\"for-you\"");
    }

    #[test]
    fn test_default_is_for_you() {
        assert_eq!(FeedKind::default(), FeedKind::ForYou);
    }
}
