//! Promotions and marketing tools.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::{Price, RestaurantId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireOwner;
use crate::services::{MutationError, PromotionInput};
use crate::state::AppState;
use crate::supabase::records::Promotion;

use super::{OwnerNav, owner_context};

/// Flash query parameters.
#[derive(Debug, Deserialize)]
pub struct MarketingQuery {
    pub success: Option<String>,
}

/// New promotion form data. Numeric fields arrive as text and are parsed
/// here so a typo comes back as an inline message, not a 422.
#[derive(Debug, Default, Deserialize)]
pub struct PromotionForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_percentage: String,
    #[serde(default)]
    pub discount_amount: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub is_active: Option<String>,
}

impl PromotionForm {
    fn parse(&self) -> Result<PromotionInput, String> {
        let discount_percentage = match self.discount_percentage.trim() {
            "" => None,
            raw => Some(
                raw.parse::<Decimal>()
                    .map_err(|_| "Discount percentage must be a number".to_string())?,
            ),
        };
        let discount_amount = match self.discount_amount.trim() {
            "" => None,
            raw => Some(
                raw.parse::<Price>()
                    .map_err(|_| "Discount amount must be a valid amount".to_string())?,
            ),
        };
        let description = self.description.trim();

        Ok(PromotionInput {
            name: self.name.clone(),
            description: (!description.is_empty()).then(|| description.to_string()),
            discount_percentage,
            discount_amount,
            start_date: self.start_date.trim().to_string(),
            end_date: self.end_date.trim().to_string(),
            is_active: self.is_active.is_some(),
        })
    }
}

/// Marketing page template.
#[derive(Template, WebTemplate)]
#[template(path = "owner/marketing.html")]
pub struct MarketingTemplate {
    pub nav: OwnerNav,
    pub promotions: Vec<Promotion>,
    pub success: Option<&'static str>,
    pub form: PromotionForm,
    pub form_error: Option<String>,
}

async fn marketing_template(
    state: &AppState,
    nav: OwnerNav,
    restaurant: RestaurantId,
) -> Result<MarketingTemplate, AppError> {
    let promotions = state
        .queries()
        .read(QueryKey::Promotions { restaurant })
        .await?
        .into_promotions()?;

    Ok(MarketingTemplate {
        nav,
        promotions,
        success: None,
        form: PromotionForm::default(),
        form_error: None,
    })
}

/// Display promotions and the creation form.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn marketing_page(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Query(query): Query<MarketingQuery>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "marketing").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let mut page = marketing_template(&state, context.nav, context.restaurant_id).await?;
    if query.success.as_deref() == Some("promotion_created") {
        page.success = Some("Promotion created.");
    }
    Ok(page.into_response())
}

/// Handle the new promotion form.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn create_promotion(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Form(form): Form<PromotionForm>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "marketing").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => {
            let mut page = marketing_template(&state, context.nav, context.restaurant_id).await?;
            page.form = form;
            page.form_error = Some(message);
            return Ok(page.into_response());
        }
    };

    match state
        .mutations()
        .create_promotion(&user.token, context.restaurant_id, &input)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/marketing?success=promotion_created").into_response()),
        Err(MutationError::Invalid(message)) => {
            let mut page = marketing_template(&state, context.nav, context.restaurant_id).await?;
            page.form = form;
            page.form_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "promotion insert failed");
            let mut page = marketing_template(&state, context.nav, context.restaurant_id).await?;
            page.form = form;
            page.form_error = Some("Could not save changes. Please try again.".to_string());
            Ok(page.into_response())
        }
    }
}
