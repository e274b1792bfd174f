use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Facility Repository
// ============================================================================

pub struct FacilityRepository;

const FACILITY_COLUMNS: &str = r#"
    id, category_id, name, description, hourly_rate, daily_rate, is_active,
    is_closed_for_event, closure_reason, closure_end_date,
    created_at, updated_at
"#;

impl FacilityRepository {
    /// List facilities with their category name, optionally restricted to one category.
    pub async fn list(
        pool: &SqlitePool,
        category_id: Option<&str>,
    ) -> AppResult<Vec<FacilityListItem>> {
        sqlx::query_as::<_, FacilityListItem>(
            r#"
            SELECT
                f.id, f.category_id, c.name AS category_name, f.name, f.description,
                f.hourly_rate, f.daily_rate, f.is_active,
                f.is_closed_for_event, f.closure_reason, f.closure_end_date
            FROM facilities f
            JOIN categories c ON c.id = f.category_id
            WHERE (? IS NULL OR f.category_id = ?)
            ORDER BY f.name ASC
            "#,
        )
        .bind(category_id)
        .bind(category_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> AppResult<Option<Facility>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM facilities WHERE id = ?", FACILITY_COLUMNS);
        sqlx::query_as::<_, Facility>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    /// Count how many of the given ids exist.
    pub async fn count_existing<'e, E>(executor: E, ids: &[String]) -> AppResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder =
            sqlx::QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM facilities WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        builder
            .build_query_scalar::<i64>()
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn create(pool: &SqlitePool, input: &FacilityInput) -> AppResult<Facility> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let sql = format!(
            r#"
            INSERT INTO facilities (
                id, category_id, name, description, hourly_rate, daily_rate,
                is_active, is_closed_for_event, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 1, 0, ?, ?)
            RETURNING {}
            "#,
            FACILITY_COLUMNS
        );

        sqlx::query_as::<_, Facility>(&sql)
            .bind(&id)
            .bind(&input.category_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.hourly_rate)
            .bind(input.daily_rate)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        input: &FacilityInput,
    ) -> AppResult<Option<Facility>> {
        let now = Utc::now().naive_utc();
        let sql = format!(
            r#"
            UPDATE facilities
            SET category_id = ?, name = ?, description = ?, hourly_rate = ?, daily_rate = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            FACILITY_COLUMNS
        );

        sqlx::query_as::<_, Facility>(&sql)
            .bind(&input.category_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.hourly_rate)
            .bind(input.daily_rate)
            .bind(now)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn set_active(pool: &SqlitePool, id: &str, is_active: bool) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query("UPDATE facilities SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Reservations that still hold the facility: pending or confirmed and not yet over.
    pub async fn count_active_reservations(
        pool: &SqlitePool,
        facility_id: &str,
        now: NaiveDateTime,
    ) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reservations
            WHERE facility_id = ?
              AND status IN ('pending', 'confirmed')
              AND end_time >= ?
            "#,
        )
        .bind(facility_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn apply_closure<'e, E>(
        executor: E,
        facility_id: &str,
        reason: &str,
        end_date: NaiveDate,
    ) -> AppResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE facilities
            SET is_closed_for_event = 1, closure_reason = ?, closure_end_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reason)
        .bind(end_date)
        .bind(now)
        .bind(facility_id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn clear_closure<'e, E>(executor: E, facility_id: &str) -> AppResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE facilities
            SET is_closed_for_event = 0, closure_reason = NULL, closure_end_date = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(facility_id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Facilities still flagged closed although their closure ended before `today`.
    pub async fn list_lapsed_closures(pool: &SqlitePool, today: NaiveDate) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT id
            FROM facilities
            WHERE is_closed_for_event = 1
              AND (closure_end_date IS NULL OR closure_end_date < ?)
            "#,
        )
        .bind(today)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
