use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Facility Event Models (closures)
// ============================================================================

/// A calendar event that closes one or more facilities.
///
/// `facility_ids` is persisted as a JSON array in a single TEXT column, so this
/// struct is mapped by hand in the repository rather than through `FromRow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub facility_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `None` for all-day events
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl FacilityEvent {
    pub fn lists_facility(&self, facility_id: &str) -> bool {
        self.facility_ids.iter().any(|id| id == facility_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityEventInput {
    pub title: String,
    pub description: Option<String>,
    pub facility_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}
