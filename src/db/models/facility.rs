use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Facility Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: f64,
    pub daily_rate: f64,
    pub is_active: bool,

    // Closure state mirrored from facility_events by the event closure service
    pub is_closed_for_event: bool,
    pub closure_reason: Option<String>,
    pub closure_end_date: Option<NaiveDate>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FacilityListItem {
    pub id: String,
    pub category_id: String,
    pub category_name: String,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: f64,
    pub daily_rate: f64,
    pub is_active: bool,
    pub is_closed_for_event: bool,
    pub closure_reason: Option<String>,
    pub closure_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityInput {
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: f64,
    pub daily_rate: f64,
}
