use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::{BookingType, Reservation, ReservationDetail, ReservationFilter};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::routes::auth::AuthContext;
use crate::routes::page;
use crate::services::{
    local_now,
    payments::PaymentManager,
    reports::ReportService,
    reservations::{BookingRequest, ReservationService},
};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_own).post(create))
        .route("/:id/payment-slip", post(submit_payment_slip))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub facility_id: String,
    pub pricing_option_id: Option<String>,
    /// `YYYY-MM-DDTHH:MM[:SS]`, facility local time
    pub start_time: String,
    pub end_time: String,
    pub booking_type: Option<String>,
    pub attendees: Option<i64>,
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentSlipRequest {
    pub payment_slip_url: String,
}

fn invalid_datetime(label: &str) -> AppError {
    AppError::Validation(i18n::t_with(
        "validation.invalid_datetime",
        &[("field", label)],
    ))
}

impl CreateBookingRequest {
    fn into_booking(self) -> AppResult<BookingRequest> {
        let start_time =
            page::parse_datetime(&self.start_time).ok_or_else(|| invalid_datetime("Start time"))?;
        let end_time =
            page::parse_datetime(&self.end_time).ok_or_else(|| invalid_datetime("End time"))?;

        let booking_type = match self.booking_type.as_deref().map(str::trim) {
            None | Some("") => BookingType::Hourly,
            Some(raw) => BookingType::parse(raw).ok_or_else(|| {
                AppError::Validation(i18n::t_with(
                    "validation.invalid_value",
                    &[("field", "booking_type"), ("value", raw)],
                ))
            })?,
        };

        Ok(BookingRequest {
            facility_id: self.facility_id.trim().to_string(),
            pricing_option_id: page::filter_text(&self.pricing_option_id),
            start_time,
            end_time,
            booking_type,
            attendees: self.attendees.unwrap_or(1),
            purpose: page::filter_text(&self.purpose),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// The caller's own reservations, newest first.
async fn list_own(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> AppResult<Json<Vec<ReservationDetail>>> {
    let filter = ReservationFilter {
        user_id: Some(ctx.user.id),
        ..Default::default()
    };
    Ok(Json(ReportService::reservation_list(&state, &filter).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(request): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let booking = request.into_booking()?;
    let reservation =
        ReservationService::create_reservation(&state, ctx.user_id(), booking, local_now()).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn submit_payment_slip(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(request): Json<PaymentSlipRequest>,
) -> AppResult<Json<Reservation>> {
    let reservation =
        PaymentManager::submit_payment_slip(&state, &id, ctx.user_id(), &request.payment_slip_url)
            .await?;
    Ok(Json(reservation))
}
