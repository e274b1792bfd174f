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
    FacilityListItem, FacilityRepository, ReservationDetail, ReservationFilter, ReservationStatus,
    UsageFilter, UsageHistoryEntry, UsageSort, UsageStatus,
};
use crate::error::AppResult;
use crate::i18n;
use crate::routes::auth::OperatorUser;
use crate::routes::page::{self, Flash};
use crate::services::{local_now, reports::ReportService, usage::UsageManager};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(show).post(act))
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub facility: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub user: Option<String>,
    pub sort: Option<String>,
}

impl UsageQuery {
    fn filter(&self) -> UsageFilter {
        UsageFilter {
            facility_id: page::filter_text(&self.facility),
            status: page::filter_enum(&self.status, UsageStatus::parse),
            date_from: page::filter_date(&self.date_from),
            date_to: page::filter_date(&self.date_to),
            user_query: page::filter_text(&self.user),
            sort: page::filter_enum(&self.sort, UsageSort::parse).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsageForm {
    #[serde(default)]
    pub action: String,
    pub reservation_id: Option<String>,
    pub log_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsagePage {
    pub history: Vec<UsageHistoryEntry>,
    /// Confirmed reservations a usage session can be started for.
    pub ready_to_start: Vec<ReservationDetail>,
    pub facilities: Vec<FacilityListItem>,
    pub sort: UsageSort,
}

async fn render(
    state: &Arc<AppState>,
    query: &UsageQuery,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let filter = query.filter();
    let history = ReportService::usage_history(state, &filter).await?;
    let ready_to_start = ReportService::reservation_list(
        state,
        &ReservationFilter {
            status: Some(ReservationStatus::Confirmed),
            facility_id: filter.facility_id.clone(),
            ..Default::default()
        },
    )
    .await?;
    let facilities = FacilityRepository::list(&state.db, None).await?;

    Ok(page::render(
        status,
        flash,
        UsagePage {
            history,
            ready_to_start,
            facilities,
            sort: filter.sort,
        },
    ))
}

async fn show(
    State(state): State<Arc<AppState>>,
    _operator: OperatorUser,
    Query(query): Query<UsageQuery>,
) -> AppResult<Response> {
    render(&state, &query, StatusCode::OK, None).await
}

async fn act(
    State(state): State<Arc<AppState>>,
    OperatorUser(ctx): OperatorUser,
    Query(query): Query<UsageQuery>,
    Form(form): Form<UsageForm>,
) -> AppResult<Response> {
    let result = run_action(&state, ctx.user_id(), &form).await;
    let (status, flash) = page::action_flash(&form.action, result);
    render(&state, &query, status, Some(flash)).await
}

async fn run_action(state: &Arc<AppState>, actor_id: &str, form: &UsageForm) -> AppResult<String> {
    match form.action.as_str() {
        "start_usage" => {
            let id = page::required(&form.reservation_id, "Reservation")?;
            UsageManager::start_usage(state, id, local_now()).await?;
            Ok(i18n::t("usage.started"))
        }
        "complete_usage" => {
            let id = page::required(&form.log_id, "Usage log")?;
            let log = UsageManager::complete_usage(state, id, local_now()).await?;
            let minutes = log.duration_minutes.unwrap_or(0).to_string();
            Ok(i18n::t_with("usage.completed", &[("minutes", minutes.as_str())]))
        }
        "verify_usage" => {
            let id = page::required(&form.log_id, "Usage log")?;
            UsageManager::verify_usage(state, id, actor_id, page::field(&form.notes)).await?;
            Ok(i18n::t("usage.verified"))
        }
        other => Err(page::unknown_action(other)),
    }
}
