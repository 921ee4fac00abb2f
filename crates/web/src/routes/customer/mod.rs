//! Customer-facing pages: feed, discovery, grocery, communities.

use plateful_core::{FeedKind, UserId};

use crate::cache::QueryKey;
use crate::models::Identity;

pub mod communities;
pub mod discover;
pub mod directory;
pub mod grocery;
pub mod home;
pub mod marketplace;
pub mod placeholders;
pub mod posts;
pub mod profile;

/// Sidebar state shared by every customer page.
pub struct CustomerNav {
    pub display_name: String,
    pub active: &'static str,
}

impl CustomerNav {
    fn new(identity: &Identity, active: &'static str) -> Self {
        Self {
            display_name: identity.email.local_part().to_string(),
            active,
        }
    }
}

/// Cache key for one feed tab. Only the following feed is scoped to the
/// viewer; the shared tabs use one cache entry for everyone.
pub(crate) fn feed_key(tab: FeedKind, viewer: UserId) -> QueryKey {
    QueryKey::Posts {
        feed: tab,
        viewer: (tab == FeedKind::Following).then_some(viewer),
    }
}
