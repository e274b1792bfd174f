use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{ReservationStatus, UsageStatus};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: String,
    pub reservation_id: String,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub status: UsageStatus,
    pub total_amount: f64,
    pub verified_by: Option<String>,
    pub verified_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One row of the usage history page.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsageHistoryEntry {
    pub id: String,
    pub reservation_id: String,
    pub facility_id: String,
    pub facility_name: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub reservation_status: ReservationStatus,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub status: UsageStatus,
    pub total_amount: f64,
    pub verified_at: Option<NaiveDateTime>,
}
