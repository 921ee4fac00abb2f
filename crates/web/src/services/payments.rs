//! Subscription plan catalogue for the pricing page and checkout.
//!
//! Plans are static: the widget on the checkout page charges the listed
//! amount and the platform records the approval. There is no entitlement
//! system behind it yet.

/// Badge rendered on a plan card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanBadge {
    MostPopular,
    LimitedTime,
}

impl PlanBadge {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MostPopular => "Most Popular",
            Self::LimitedTime => "Limited Time",
        }
    }
}

/// Which price a buyer is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

impl BillingCycle {
    /// Parse the `billing` query parameter, defaulting to monthly.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("annual") => Self::Annual,
            _ => Self::Monthly,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }
}

/// One subscription tier.
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub slug: &'static str,
    pub name: &'static str,
    pub monthly_price: u32,
    pub annual_price: u32,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub cta: &'static str,
    pub badge: Option<PlanBadge>,
    /// Charged once; the monthly/annual toggle does not apply.
    pub one_time: bool,
}

impl Plan {
    /// Amount in whole dollars for the chosen billing cycle.
    #[must_use]
    pub const fn price_for(&self, billing: BillingCycle) -> u32 {
        if self.one_time {
            return self.monthly_price;
        }
        match billing {
            BillingCycle::Monthly => self.monthly_price,
            BillingCycle::Annual => self.annual_price,
        }
    }

    /// Suffix rendered after the amount.
    #[must_use]
    pub const fn cadence_label(&self, billing: BillingCycle) -> &'static str {
        if self.one_time {
            return "one-time";
        }
        match billing {
            BillingCycle::Monthly => "/month",
            BillingCycle::Annual => "/year",
        }
    }

    /// Whether the comparison table ticks `feature` for this plan.
    ///
    /// A plan covers a feature when one of its bullet points mentions it,
    /// or when the plan inherits everything from a lower tier.
    #[must_use]
    pub fn includes(&self, feature: &str) -> bool {
        let feature = feature.to_lowercase();
        self.features.iter().any(|bullet| {
            bullet.to_lowercase().contains(&feature) || bullet.contains("Everything in")
        })
    }

    #[must_use]
    pub fn free(&self) -> bool {
        self.monthly_price == 0
    }
}

pub const PLANS: [Plan; 5] = [
    Plan {
        slug: "free",
        name: "Free",
        monthly_price: 0,
        annual_price: 0,
        description: "Perfect for trying out our platform",
        features: &["Basic menu management", "Customer feedback", "Basic analytics"],
        cta: "Get Started",
        badge: None,
        one_time: false,
    },
    Plan {
        slug: "starter",
        name: "Starter",
        monthly_price: 29,
        annual_price: 290,
        description: "Great for small restaurants",
        features: &[
            "Advanced menu management",
            "Priority support",
            "Detailed analytics",
            "Custom branding",
        ],
        cta: "Start Free Trial",
        badge: None,
        one_time: false,
    },
    Plan {
        slug: "pro",
        name: "Pro",
        monthly_price: 79,
        annual_price: 790,
        description: "Best for growing businesses",
        features: &[
            "Everything in Starter",
            "API access",
            "Advanced integrations",
            "Custom reports",
            "Team management",
        ],
        cta: "Start Free Trial",
        badge: Some(PlanBadge::MostPopular),
        one_time: false,
    },
    Plan {
        slug: "enterprise",
        name: "Enterprise",
        monthly_price: 199,
        annual_price: 1990,
        description: "For large restaurant chains",
        features: &[
            "Everything in Pro",
            "Dedicated support",
            "Custom development",
            "SLA guarantee",
            "Advanced security",
        ],
        cta: "Contact Sales",
        badge: None,
        one_time: false,
    },
    Plan {
        slug: "lifetime",
        name: "Lifetime",
        monthly_price: 999,
        annual_price: 999,
        description: "One-time payment, lifetime access",
        features: &[
            "All Enterprise features",
            "Lifetime updates",
            "Priority feature requests",
            "Exclusive community",
        ],
        cta: "Get Lifetime Access",
        badge: Some(PlanBadge::LimitedTime),
        one_time: true,
    },
];

/// Rows of the feature comparison table on the pricing page.
pub const COMPARISON_FEATURES: [&str; 9] = [
    "Menu Management",
    "Customer Feedback",
    "Analytics Dashboard",
    "API Access",
    "Custom Branding",
    "Priority Support",
    "Team Management",
    "Custom Development",
    "SLA Guarantee",
];

/// Look a plan up by its URL slug.
#[must_use]
pub fn find_plan(slug: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.slug == slug)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn finds_plans_by_slug() {
        assert_eq!(find_plan("pro").unwrap().name, "Pro");
        assert!(find_plan("platinum").is_none());
    }

    #[test]
    fn annual_billing_uses_the_annual_price() {
        let starter = find_plan("starter").unwrap();
        assert_eq!(starter.price_for(BillingCycle::Monthly), 29);
        assert_eq!(starter.price_for(BillingCycle::Annual), 290);
    }

    #[test]
    fn lifetime_is_one_time_regardless_of_cycle() {
        let lifetime = find_plan("lifetime").unwrap();
        assert_eq!(lifetime.price_for(BillingCycle::Annual), 999);
        assert_eq!(lifetime.cadence_label(BillingCycle::Annual), "one-time");
    }

    #[test]
    fn comparison_ticks_direct_mentions() {
        let free = find_plan("free").unwrap();
        assert!(free.includes("Menu Management"));
        assert!(!free.includes("API Access"));
    }

    #[test]
    fn higher_tiers_inherit_lower_tier_features() {
        let enterprise = find_plan("enterprise").unwrap();
        assert!(enterprise.includes("API Access"));
        assert!(enterprise.includes("Team Management"));
    }

    #[test]
    fn billing_cycle_parses_from_query() {
        assert_eq!(BillingCycle::from_query(Some("annual")), BillingCycle::Annual);
        assert_eq!(BillingCycle::from_query(Some("bogus")), BillingCycle::Monthly);
        assert_eq!(BillingCycle::from_query(None), BillingCycle::Monthly);
    }
}
