use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Facility Event Repository
// ============================================================================

pub struct FacilityEventRepository;

const EVENT_COLUMNS: &str = r#"
    id, title, description, facility_ids, start_date, end_date,
    start_time, end_time, is_active, created_by, created_at, updated_at
"#;

/// Raw row; `facility_ids` is still the JSON text from the column.
#[derive(FromRow)]
struct EventRow {
    id: String,
    title: String,
    description: Option<String>,
    facility_ids: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    is_active: bool,
    created_by: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<EventRow> for FacilityEvent {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let facility_ids = decode_facility_ids(&row.facility_ids)?;
        Ok(FacilityEvent {
            id: row.id,
            title: row.title,
            description: row.description,
            facility_ids,
            start_date: row.start_date,
            end_date: row.end_date,
            start_time: row.start_time,
            end_time: row.end_time,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode_facility_ids(raw: &str) -> AppResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Corrupt facility_ids column: {}", e))
    })
}

fn encode_facility_ids(ids: &[String]) -> AppResult<String> {
    serde_json::to_string(ids)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode facility_ids: {}", e)))
}

impl FacilityEventRepository {
    pub async fn list_all<'e, E>(executor: E) -> AppResult<Vec<FacilityEvent>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {} FROM facility_events ORDER BY start_date DESC, created_at DESC",
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)?;

        rows.into_iter().map(FacilityEvent::try_from).collect()
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> AppResult<Option<FacilityEvent>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM facility_events WHERE id = ?", EVENT_COLUMNS);
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)?;

        row.map(FacilityEvent::try_from).transpose()
    }

    pub async fn insert<'e, E>(
        executor: E,
        input: &FacilityEventInput,
        created_by: &str,
    ) -> AppResult<FacilityEvent>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let facility_ids = encode_facility_ids(&input.facility_ids)?;

        let sql = format!(
            r#"
            INSERT INTO facility_events (
                id, title, description, facility_ids, start_date, end_date,
                start_time, end_time, is_active, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(&id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&facility_ids)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(created_by)
            .bind(now)
            .bind(now)
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)?;

        FacilityEvent::try_from(row)
    }

    pub async fn update<'e, E>(executor: E, id: &str, input: &FacilityEventInput) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        let facility_ids = encode_facility_ids(&input.facility_ids)?;

        let result = sqlx::query(
            r#"
            UPDATE facility_events
            SET title = ?, description = ?, facility_ids = ?, start_date = ?, end_date = ?,
                start_time = ?, end_time = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&facility_ids)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    pub async fn set_active<'e, E>(executor: E, id: &str, is_active: bool) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        let result =
            sqlx::query("UPDATE facility_events SET is_active = ?, updated_at = ? WHERE id = ?")
                .bind(is_active)
                .bind(now)
                .bind(id)
                .execute(executor)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: &str) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM facility_events WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Active events that still cover `today` or a later day.
    pub async fn list_active_not_lapsed<'e, E>(
        executor: E,
        today: NaiveDate,
    ) -> AppResult<Vec<FacilityEvent>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {} FROM facility_events WHERE is_active = 1 AND end_date >= ? ORDER BY end_date DESC",
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(today)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)?;

        rows.into_iter().map(FacilityEvent::try_from).collect()
    }
}
