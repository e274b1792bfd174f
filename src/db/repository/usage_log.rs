use chrono::{NaiveDateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Usage Log Repository
// ============================================================================

pub struct UsageLogRepository;

const USAGE_COLUMNS: &str = r#"
    id, reservation_id, started_at, completed_at, duration_minutes, status,
    total_amount, verified_by, verified_at, notes, created_at, updated_at
"#;

impl UsageLogRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> AppResult<Option<UsageLog>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM usage_logs WHERE id = ?", USAGE_COLUMNS);
        sqlx::query_as::<_, UsageLog>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_active_for_reservation(
        pool: &SqlitePool,
        reservation_id: &str,
    ) -> AppResult<Option<UsageLog>> {
        let sql = format!(
            "SELECT {} FROM usage_logs WHERE reservation_id = ? AND status = 'active' LIMIT 1",
            USAGE_COLUMNS
        );
        sqlx::query_as::<_, UsageLog>(&sql)
            .bind(reservation_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn create(
        pool: &SqlitePool,
        reservation_id: &str,
        started_at: NaiveDateTime,
        total_amount: f64,
    ) -> AppResult<UsageLog> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let sql = format!(
            r#"
            INSERT INTO usage_logs (
                id, reservation_id, started_at, status, total_amount, created_at, updated_at
            )
            VALUES (?, ?, ?, 'active', ?, ?, ?)
            RETURNING {}
            "#,
            USAGE_COLUMNS
        );

        sqlx::query_as::<_, UsageLog>(&sql)
            .bind(&id)
            .bind(reservation_id)
            .bind(started_at)
            .bind(total_amount)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    /// active -> completed. Returns rows changed; zero means the log was not active.
    pub async fn complete<'e, E>(
        executor: E,
        id: &str,
        completed_at: NaiveDateTime,
        duration_minutes: i64,
        total_amount: f64,
    ) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE usage_logs
            SET status = 'completed', completed_at = ?, duration_minutes = ?, total_amount = ?,
                updated_at = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(completed_at)
        .bind(duration_minutes)
        .bind(total_amount)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// completed -> verified.
    pub async fn verify(
        pool: &SqlitePool,
        id: &str,
        verifier_id: &str,
        notes: Option<&str>,
    ) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE usage_logs
            SET status = 'verified', verified_by = ?, verified_at = ?,
                notes = COALESCE(?, notes), updated_at = ?
            WHERE id = ? AND status = 'completed'
            "#,
        )
        .bind(verifier_id)
        .bind(now)
        .bind(notes)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
