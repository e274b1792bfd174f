use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PricingOption {
    pub id: String,
    pub facility_id: String,
    pub name: String,
    pub price_per_hour: f64,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOptionInput {
    pub facility_id: String,
    pub name: String,
    pub price_per_hour: f64,
    pub sort_order: i64,
    pub is_active: bool,
}
