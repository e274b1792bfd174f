use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};

use crate::db::{
    CategoryRepository, CategoryWithCount, FacilityInput, FacilityListItem, FacilityRepository,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::routes::auth::AdminUser;
use crate::routes::page::{self, Flash};
use crate::services::{catalog::CatalogService, local_now};
use crate::AppState;

/// `/admin/facilities`
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(show).post(act))
}

/// `/api/facilities`
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/active-reservations",
        post(active_reservations).fallback(method_not_allowed),
    )
}

// ============================================================================
// Page
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FacilityQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacilityForm {
    #[serde(default)]
    pub action: String,
    pub id: Option<String>,
    pub category_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<String>,
    pub daily_rate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FacilitiesPage {
    pub facilities: Vec<FacilityListItem>,
    pub categories: Vec<CategoryWithCount>,
    pub selected_category: Option<String>,
}

async fn render(
    state: &Arc<AppState>,
    query: &FacilityQuery,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let selected_category = page::filter_text(&query.category);
    let facilities = FacilityRepository::list(&state.db, selected_category.as_deref()).await?;
    let categories = CategoryRepository::list_with_counts(&state.db).await?;

    Ok(page::render(
        status,
        flash,
        FacilitiesPage {
            facilities,
            categories,
            selected_category,
        },
    ))
}

async fn show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<FacilityQuery>,
) -> AppResult<Response> {
    render(&state, &query, StatusCode::OK, None).await
}

async fn act(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<FacilityQuery>,
    Form(form): Form<FacilityForm>,
) -> AppResult<Response> {
    let result = run_action(&state, &form).await;
    let (status, flash) = page::action_flash(&form.action, result);
    render(&state, &query, status, Some(flash)).await
}

fn input(form: &FacilityForm) -> AppResult<FacilityInput> {
    Ok(FacilityInput {
        category_id: page::required(&form.category_id, "Category")?.to_string(),
        name: form.name.clone().unwrap_or_default(),
        description: form.description.clone(),
        hourly_rate: page::parse_number(&form.hourly_rate, "Hourly rate")?,
        daily_rate: page::parse_number(&form.daily_rate, "Daily rate")?,
    })
}

async fn run_action(state: &Arc<AppState>, form: &FacilityForm) -> AppResult<String> {
    match form.action.as_str() {
        "add_facility" => {
            let facility = CatalogService::add_facility(state, input(form)?).await?;
            Ok(i18n::t_with("facility.added", &[("name", facility.name.as_str())]))
        }
        "update_facility" => {
            let id = page::required(&form.id, "Facility")?;
            let facility = CatalogService::update_facility(state, id, input(form)?).await?;
            Ok(i18n::t_with("facility.updated", &[("name", facility.name.as_str())]))
        }
        "toggle_facility" => {
            let id = page::required(&form.id, "Facility")?;
            let facility = CatalogService::toggle_facility(state, id, local_now()).await?;
            let key = if facility.is_active {
                "facility.activated"
            } else {
                "facility.deactivated"
            };
            Ok(i18n::t_with(key, &[("name", facility.name.as_str())]))
        }
        other => Err(page::unknown_action(other)),
    }
}

// ============================================================================
// Active reservations check
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FacilityIdQuery {
    pub facility_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveReservationsResponse {
    pub has_active_reservations: bool,
    pub active_reservation_count: i64,
}

/// Plain `{error}` body used by the active-reservations endpoint.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

fn facility_id_from(query: &FacilityIdQuery, body: &[u8]) -> Option<String> {
    page::field(&query.facility_id).map(str::to_string).or_else(|| {
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "facility_id")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Used by the facility list before deactivating a facility.
async fn active_reservations(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<FacilityIdQuery>,
    body: Bytes,
) -> Result<Json<ActiveReservationsResponse>, ApiError> {
    let facility_id = facility_id_from(&query, &body).ok_or_else(|| {
        ApiError(StatusCode::BAD_REQUEST, i18n::t("api.facility_id_required"))
    })?;

    let database_error = |e: AppError| {
        e.log();
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, i18n::t("api.database_error"))
    };

    if FacilityRepository::find_by_id(&state.db, &facility_id)
        .await
        .map_err(database_error)?
        .is_none()
    {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            i18n::t("api.facility_id_invalid"),
        ));
    }

    let count = CatalogService::active_reservation_count(&state, &facility_id, local_now())
        .await
        .map_err(database_error)?;

    Ok(Json(ActiveReservationsResponse {
        has_active_reservations: count > 0,
        active_reservation_count: count,
    }))
}

async fn method_not_allowed() -> ApiError {
    ApiError(
        StatusCode::METHOD_NOT_ALLOWED,
        i18n::t("api.method_not_allowed"),
    )
}
