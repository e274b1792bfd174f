use serde::Serialize;
use sqlx::FromRow;

use super::ReservationDetail;

// ============================================================================
// Report Models
// ============================================================================

#[derive(Debug, Clone, Default, FromRow, Serialize, PartialEq)]
pub struct NoShowSummary {
    pub total_no_shows: i64,
    pub revenue_lost: f64,
    pub unique_users: i64,
    pub facilities_affected: i64,
}

/// A user ranked by how many reservations they failed to attend.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NoShowOffender {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub no_show_count: i64,
    pub revenue_lost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoShowReport {
    pub summary: NoShowSummary,
    pub offenders: Vec<NoShowOffender>,
    pub reservations: Vec<ReservationDetail>,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, PartialEq)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub reservations_by_status: Vec<StatusCount>,
    pub total_reservations: i64,
    pub pending_payment_verifications: i64,
    pub paid_revenue: f64,
    pub active_facilities: i64,
    pub closed_facilities: i64,
    pub active_events: i64,
}
