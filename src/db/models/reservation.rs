use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{BookingType, PaymentStatus, ReservationStatus};

// ============================================================================
// Reservation Models
// ============================================================================

/// A booking of one facility for a time window.
///
/// `status` and `payment_status` move independently: a reservation can be
/// confirmed while its payment is still pending, and a verified payment does
/// not confirm the reservation on its own.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub facility_id: String,
    pub pricing_option_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub payment_slip_url: Option<String>,
    pub total_amount: f64,
    pub booking_type: BookingType,
    pub attendees: i64,
    pub purpose: Option<String>,

    pub payment_verified_by: Option<String>,
    pub payment_verified_at: Option<NaiveDateTime>,
    pub payment_notes: Option<String>,

    pub no_show_marked_by: Option<String>,
    pub no_show_marked_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Reservation joined with the user and facility names shown on admin pages.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReservationDetail {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub facility_id: String,
    pub facility_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub payment_slip_url: Option<String>,
    pub total_amount: f64,
    pub booking_type: BookingType,
    pub attendees: i64,
    pub purpose: Option<String>,
    pub payment_notes: Option<String>,
    pub no_show_marked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservation {
    pub user_id: String,
    pub facility_id: String,
    pub pricing_option_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_amount: f64,
    pub booking_type: BookingType,
    pub attendees: i64,
    pub purpose: Option<String>,
}
