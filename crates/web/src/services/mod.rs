//! Application services sitting between the routes and the platform.

pub mod mutations;
pub mod payments;
pub mod session;

pub use mutations::{MenuItemInput, MutationError, Mutations, PromotionInput, RestaurantInput};
pub use payments::{BillingCycle, Plan, PlanBadge, COMPARISON_FEATURES, PLANS};
pub use session::{AuthEvent, AuthEvents, SessionResolver};
