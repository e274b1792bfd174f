use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Pricing Option Repository
// ============================================================================

pub struct PricingOptionRepository;

impl PricingOptionRepository {
    pub async fn list_for_facility(
        pool: &SqlitePool,
        facility_id: &str,
    ) -> AppResult<Vec<PricingOption>> {
        sqlx::query_as::<_, PricingOption>(
            r#"
            SELECT id, facility_id, name, price_per_hour, sort_order, is_active, created_at, updated_at
            FROM facility_pricing_options
            WHERE facility_id = ?
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .bind(facility_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<PricingOption>> {
        sqlx::query_as::<_, PricingOption>(
            r#"
            SELECT id, facility_id, name, price_per_hour, sort_order, is_active, created_at, updated_at
            FROM facility_pricing_options
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(pool: &SqlitePool, input: &PricingOptionInput) -> AppResult<PricingOption> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, PricingOption>(
            r#"
            INSERT INTO facility_pricing_options (
                id, facility_id, name, price_per_hour, sort_order, is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, facility_id, name, price_per_hour, sort_order, is_active, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(&input.facility_id)
        .bind(&input.name)
        .bind(input.price_per_hour)
        .bind(input.sort_order)
        .bind(input.is_active)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        input: &PricingOptionInput,
    ) -> AppResult<Option<PricingOption>> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, PricingOption>(
            r#"
            UPDATE facility_pricing_options
            SET name = ?, price_per_hour = ?, sort_order = ?, is_active = ?, updated_at = ?
            WHERE id = ? AND facility_id = ?
            RETURNING id, facility_id, name, price_per_hour, sort_order, is_active, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(input.price_per_hour)
        .bind(input.sort_order)
        .bind(input.is_active)
        .bind(now)
        .bind(id)
        .bind(&input.facility_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn count_reservation_refs(pool: &SqlitePool, id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE pricing_option_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM facility_pricing_options WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
