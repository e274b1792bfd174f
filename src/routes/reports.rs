use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{DashboardStats, FacilityListItem, FacilityRepository, NoShowFilter, NoShowReport};
use crate::error::AppResult;
use crate::routes::auth::OperatorUser;
use crate::routes::page;
use crate::services::{local_today, reports::ReportService};
use crate::AppState;

/// `/admin/reports`
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/no-shows", get(no_shows))
}

/// `/admin/dashboard`
pub fn dashboard_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(dashboard))
}

#[derive(Debug, Default, Deserialize)]
pub struct NoShowQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub facility: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoShowPage {
    #[serde(flatten)]
    pub report: NoShowReport,
    pub facilities: Vec<FacilityListItem>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

async fn no_shows(
    State(state): State<Arc<AppState>>,
    _operator: OperatorUser,
    Query(query): Query<NoShowQuery>,
) -> AppResult<Response> {
    let filter = NoShowFilter {
        date_from: page::filter_date(&query.date_from),
        date_to: page::filter_date(&query.date_to),
        facility_id: page::filter_text(&query.facility),
        user_query: page::filter_text(&query.user),
    };

    let report = ReportService::no_show_report(&state, &filter).await?;
    let facilities = FacilityRepository::list(&state.db, None).await?;

    Ok(page::render(
        StatusCode::OK,
        None,
        NoShowPage {
            report,
            facilities,
            date_from: filter.date_from,
            date_to: filter.date_to,
        },
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub stats: DashboardStats,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    _operator: OperatorUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Response> {
    let date_from = page::filter_date(&query.date_from);
    let date_to = page::filter_date(&query.date_to);
    let stats = ReportService::dashboard(&state, date_from, date_to, local_today()).await?;

    Ok(page::render(
        StatusCode::OK,
        None,
        DashboardPage {
            stats,
            date_from,
            date_to,
        },
    ))
}
