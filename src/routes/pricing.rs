use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};

use crate::db::{
    FacilityListItem, FacilityRepository, PricingOption, PricingOptionInput,
    PricingOptionRepository,
};
use crate::error::AppResult;
use crate::i18n;
use crate::routes::auth::AdminUser;
use crate::routes::page::{self, Flash};
use crate::services::catalog::CatalogService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(show).post(act))
}

#[derive(Debug, Deserialize)]
pub struct PricingQuery {
    pub facility: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PricingForm {
    #[serde(default)]
    pub action: String,
    pub id: Option<String>,
    pub facility_id: Option<String>,
    pub name: Option<String>,
    pub price_per_hour: Option<String>,
    pub sort_order: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PricingPage {
    pub facilities: Vec<FacilityListItem>,
    pub selected_facility: Option<String>,
    pub pricing_options: Vec<PricingOption>,
}

async fn render(
    state: &Arc<AppState>,
    query: &PricingQuery,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let facilities = FacilityRepository::list(&state.db, None).await?;
    let selected_facility = page::filter_text(&query.facility);
    let pricing_options = match &selected_facility {
        Some(facility_id) => {
            PricingOptionRepository::list_for_facility(&state.db, facility_id).await?
        }
        None => Vec::new(),
    };

    Ok(page::render(
        status,
        flash,
        PricingPage {
            facilities,
            selected_facility,
            pricing_options,
        },
    ))
}

async fn show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<PricingQuery>,
) -> AppResult<Response> {
    render(&state, &query, StatusCode::OK, None).await
}

async fn act(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<PricingQuery>,
    Form(form): Form<PricingForm>,
) -> AppResult<Response> {
    let result = run_action(&state, &form).await;
    let (status, flash) = page::action_flash(&form.action, result);
    render(&state, &query, status, Some(flash)).await
}

fn input(form: &PricingForm, is_active: bool) -> AppResult<PricingOptionInput> {
    Ok(PricingOptionInput {
        facility_id: page::required(&form.facility_id, "Facility")?.to_string(),
        name: form.name.clone().unwrap_or_default(),
        price_per_hour: page::parse_number(&form.price_per_hour, "Price per hour")?,
        sort_order: page::parse_optional_int(&form.sort_order, "Sort order")?.unwrap_or(0),
        is_active,
    })
}

async fn run_action(state: &Arc<AppState>, form: &PricingForm) -> AppResult<String> {
    match form.action.as_str() {
        "add_pricing_option" => {
            // New options are active unless the form says otherwise
            let is_active = form.is_active.is_none() || page::checkbox(&form.is_active);
            let option =
                CatalogService::add_pricing_option(state, input(form, is_active)?).await?;
            Ok(i18n::t_with("pricing.added", &[("name", option.name.as_str())]))
        }
        "update_pricing_option" => {
            let id = page::required(&form.id, "Pricing option")?;
            let input = input(form, page::checkbox(&form.is_active))?;
            let option = CatalogService::update_pricing_option(state, id, input).await?;
            Ok(i18n::t_with("pricing.updated", &[("name", option.name.as_str())]))
        }
        "delete_pricing_option" => {
            let id = page::required(&form.id, "Pricing option")?;
            CatalogService::delete_pricing_option(state, id).await?;
            Ok(i18n::t("pricing.deleted"))
        }
        other => Err(page::unknown_action(other)),
    }
}
