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
    FacilityListItem, FacilityRepository, PaymentStatus, ReservationDetail, ReservationFilter,
    ReservationStatus,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::routes::auth::OperatorUser;
use crate::routes::page::{self, Flash};
use crate::services::{
    payments::PaymentManager, reports::ReportService, reservations::ReservationService,
};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(show).post(act))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub facility: Option<String>,
    pub user: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ReservationQuery {
    fn filter(&self) -> ReservationFilter {
        ReservationFilter {
            status: page::filter_enum(&self.status, ReservationStatus::parse),
            payment_status: page::filter_enum(&self.payment_status, PaymentStatus::parse),
            facility_id: page::filter_text(&self.facility),
            user_query: page::filter_text(&self.user),
            date_from: page::filter_date(&self.date_from),
            date_to: page::filter_date(&self.date_to),
            user_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReservationForm {
    #[serde(default)]
    pub action: String,
    #[serde(alias = "id")]
    pub reservation_id: Option<String>,
    pub status: Option<String>,
    /// `approve` or `reject`
    pub decision: Option<String>,
    pub notes: Option<String>,
}

/// A list row with the statuses it may move to next.
#[derive(Debug, Serialize)]
pub struct ReservationRow {
    #[serde(flatten)]
    pub reservation: ReservationDetail,
    pub allowed_statuses: &'static [ReservationStatus],
}

#[derive(Debug, Serialize)]
pub struct ReservationsPage {
    pub reservations: Vec<ReservationRow>,
    pub facilities: Vec<FacilityListItem>,
}

async fn render(
    state: &Arc<AppState>,
    query: &ReservationQuery,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let reservations = ReportService::reservation_list(state, &query.filter())
        .await?
        .into_iter()
        .map(|reservation| ReservationRow {
            allowed_statuses: reservation.status.allowed_targets(),
            reservation,
        })
        .collect();
    let facilities = FacilityRepository::list(&state.db, None).await?;

    Ok(page::render(
        status,
        flash,
        ReservationsPage {
            reservations,
            facilities,
        },
    ))
}

async fn show(
    State(state): State<Arc<AppState>>,
    _operator: OperatorUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Response> {
    render(&state, &query, StatusCode::OK, None).await
}

async fn act(
    State(state): State<Arc<AppState>>,
    OperatorUser(ctx): OperatorUser,
    Query(query): Query<ReservationQuery>,
    Form(form): Form<ReservationForm>,
) -> AppResult<Response> {
    let result = run_action(&state, ctx.user_id(), &form).await;
    let (status, flash) = page::action_flash(&form.action, result);
    render(&state, &query, status, Some(flash)).await
}

async fn run_action(
    state: &Arc<AppState>,
    actor_id: &str,
    form: &ReservationForm,
) -> AppResult<String> {
    match form.action.as_str() {
        "update_status" => {
            let id = page::required(&form.reservation_id, "Reservation")?;
            let raw = page::required(&form.status, "Status")?;
            let status = ReservationStatus::parse(raw).ok_or_else(|| {
                AppError::Validation(i18n::t_with(
                    "validation.invalid_value",
                    &[("field", "status"), ("value", raw)],
                ))
            })?;

            let reservation =
                ReservationService::update_status(state, id, status, actor_id).await?;
            if reservation.status == ReservationStatus::NoShow {
                Ok(i18n::t("reservation.marked_no_show"))
            } else {
                Ok(i18n::t_with(
                    "reservation.status_updated",
                    &[("status", reservation.status.as_str())],
                ))
            }
        }
        "verify_payment" => {
            let id = page::required(&form.reservation_id, "Reservation")?;
            let raw = page::required(&form.decision, "Decision")?;
            let approved = match raw.to_ascii_lowercase().as_str() {
                "approve" | "approved" | "paid" => true,
                "reject" | "rejected" => false,
                _ => {
                    return Err(AppError::Validation(i18n::t_with(
                        "validation.invalid_value",
                        &[("field", "decision"), ("value", raw)],
                    )))
                }
            };

            let notes = page::field(&form.notes);
            let outcome =
                PaymentManager::verify_payment(state, id, actor_id, approved, notes).await?;
            let key = match (approved, outcome.auto_confirmed) {
                (true, true) => "payment.approved_confirmed",
                (true, false) => "payment.approved",
                (false, _) => "payment.rejected",
            };
            Ok(i18n::t(key))
        }
        other => Err(page::unknown_action(other)),
    }
}
