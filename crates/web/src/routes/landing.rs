//! Landing page and the static legal pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::middleware::{OptionalIdentity, home_path};
use crate::services::{COMPARISON_FEATURES, PLANS, Plan};

// =============================================================================
// Feature Sections (static marketing content)
// =============================================================================

/// One feature card.
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

/// A titled group of feature cards with a call to action.
pub struct FeatureSection {
    pub title: &'static str,
    pub features: &'static [Feature],
    pub cta_text: &'static str,
    pub cta_href: &'static str,
}

const OWNER_FEATURES: FeatureSection = FeatureSection {
    title: "Built for Restaurant Owners",
    features: &[
        Feature {
            title: "Menu Management",
            description: "Organize categories, prices, and availability from one dashboard.",
        },
        Feature {
            title: "Orders & Reservations",
            description: "Track incoming orders and table bookings as they happen.",
        },
        Feature {
            title: "Promotions",
            description: "Launch discounts and campaigns that reach nearby diners.",
        },
    ],
    cta_text: "Open Your Dashboard",
    cta_href: "/auth?mode=sign-up&type=restaurant_owner",
};

const CUSTOMER_FEATURES: FeatureSection = FeatureSection {
    title: "Made for Food Lovers",
    features: &[
        Feature {
            title: "Social Feed",
            description: "Share dishes, follow friends, and see what the city is eating.",
        },
        Feature {
            title: "Discovery",
            description: "Search restaurants by name and browse menus before you go.",
        },
        Feature {
            title: "Communities & Grocery",
            description: "Join food communities and order groceries from local stores.",
        },
    ],
    cta_text: "Join the Community",
    cta_href: "/auth?mode=sign-up&type=customer",
};

// =============================================================================
// Template
// =============================================================================

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    /// Home path for a signed-in visitor, if any.
    pub app_home: Option<&'static str>,
    /// Owner-facing feature section.
    pub owner_features: FeatureSection,
    /// Customer-facing feature section.
    pub customer_features: FeatureSection,
    /// Subscription tiers for the pricing cards.
    pub plans: &'static [Plan],
    /// Rows of the comparison table.
    pub comparison: &'static [&'static str],
}

/// Display the landing page.
#[instrument(skip_all)]
pub async fn landing(OptionalIdentity(identity): OptionalIdentity) -> impl IntoResponse {
    LandingTemplate {
        app_home: identity.map(|identity| home_path(identity.role)),
        owner_features: OWNER_FEATURES,
        customer_features: CUSTOMER_FEATURES,
        plans: &PLANS,
        comparison: &COMPARISON_FEATURES,
    }
}

// =============================================================================
// Legal Pages
// =============================================================================

/// Static legal page template.
#[derive(Template, WebTemplate)]
#[template(path = "legal.html")]
pub struct LegalTemplate {
    pub title: &'static str,
    pub updated: &'static str,
    pub paragraphs: &'static [&'static str],
}

/// Display the privacy policy.
pub async fn privacy() -> impl IntoResponse {
    LegalTemplate {
        title: "Privacy Policy",
        updated: "June 2026",
        paragraphs: &[
            "Plateful stores your account, posts, orders, and reservations with \
             our hosted backend provider. We never sell your data.",
            "Session cookies keep you signed in on this device and remember \
             lightweight preferences such as the communities you follow. They \
             expire after seven days of inactivity.",
            "You can delete your account at any time from account settings; \
             this removes your profile and the content you created.",
        ],
    }
}

/// Display the terms of service.
pub async fn terms() -> impl IntoResponse {
    LegalTemplate {
        title: "Terms of Service",
        updated: "June 2026",
        paragraphs: &[
            "Plateful connects restaurant owners with customers. Owners are \
             responsible for the accuracy of their menus, prices, and \
             availability; Plateful is not a party to any sale.",
            "Keep it friendly: content that harasses other members or \
             misrepresents a business may be removed.",
            "Paid plans are billed through our payment provider. The checkout \
             flow is currently experimental and no charges are made.",
        ],
    }
}
