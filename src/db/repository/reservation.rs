use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::push_user_match;
use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Reservation Repository
// ============================================================================

pub struct ReservationRepository;

const RESERVATION_COLUMNS: &str = r#"
    id, user_id, facility_id, pricing_option_id, start_time, end_time,
    status, payment_status, payment_slip_url, total_amount, booking_type,
    attendees, purpose,
    payment_verified_by, payment_verified_at, payment_notes,
    no_show_marked_by, no_show_marked_at,
    created_at, updated_at
"#;

const DETAIL_SELECT: &str = r#"
    SELECT
        r.id, r.user_id, u.full_name AS user_name, u.email AS user_email,
        r.facility_id, f.name AS facility_name,
        r.start_time, r.end_time, r.status, r.payment_status, r.payment_slip_url,
        r.total_amount, r.booking_type, r.attendees, r.purpose, r.payment_notes,
        r.no_show_marked_at, r.created_at
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    JOIN facilities f ON f.id = r.facility_id
    WHERE 1 = 1
"#;

/// Filters for the admin reservation list.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub facility_id: Option<String>,
    pub user_query: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub user_id: Option<String>,
}

impl ReservationRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> AppResult<Option<Reservation>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM reservations WHERE id = ?", RESERVATION_COLUMNS);
        sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &ReservationFilter,
        limit: i64,
    ) -> AppResult<Vec<ReservationDetail>> {
        let mut builder = QueryBuilder::<Sqlite>::new(DETAIL_SELECT);

        if let Some(status) = filter.status {
            builder.push(" AND r.status = ").push_bind(status);
        }
        if let Some(payment_status) = filter.payment_status {
            builder
                .push(" AND r.payment_status = ")
                .push_bind(payment_status);
        }
        if let Some(facility_id) = &filter.facility_id {
            builder
                .push(" AND r.facility_id = ")
                .push_bind(facility_id.clone());
        }
        if let Some(user_id) = &filter.user_id {
            builder.push(" AND r.user_id = ").push_bind(user_id.clone());
        }
        if let Some(query) = &filter.user_query {
            push_user_match(&mut builder, query);
        }
        if let Some(from) = filter.date_from {
            builder.push(" AND date(r.start_time) >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            builder.push(" AND date(r.start_time) <= ").push_bind(to);
        }

        builder
            .push(" ORDER BY r.start_time DESC LIMIT ")
            .push_bind(limit);

        builder
            .build_query_as::<ReservationDetail>()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Insert a pending reservation unless a pending or confirmed one of the
    /// same facility intersects `[start_time, end_time)`. The overlap check is
    /// part of the INSERT, so two concurrent bookings of one slot cannot both
    /// land. Returns `None` when the slot is taken.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateReservation,
    ) -> AppResult<Option<Reservation>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let sql = format!(
            r#"
            INSERT INTO reservations (
                id, user_id, facility_id, pricing_option_id, start_time, end_time,
                status, payment_status, total_amount, booking_type, attendees, purpose,
                created_at, updated_at
            )
            SELECT ?, ?, ?, ?, ?, ?, 'pending', 'pending', ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1
                FROM reservations
                WHERE facility_id = ?
                  AND status IN ('pending', 'confirmed')
                  AND start_time < ?
                  AND ? < end_time
            )
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );

        sqlx::query_as::<_, Reservation>(&sql)
            .bind(&id)
            .bind(&input.user_id)
            .bind(&input.facility_id)
            .bind(&input.pricing_option_id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.total_amount)
            .bind(input.booking_type)
            .bind(input.attendees)
            .bind(&input.purpose)
            .bind(now)
            .bind(now)
            .bind(&input.facility_id)
            .bind(input.end_time)
            .bind(input.start_time)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    /// Compare-and-set on the status column. Returns the number of rows changed,
    /// which is zero when the row is no longer in `from`.
    pub async fn update_status<'e, E>(
        executor: E,
        id: &str,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            "UPDATE reservations SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    pub async fn mark_no_show(
        pool: &SqlitePool,
        id: &str,
        from: ReservationStatus,
        marked_by: &str,
    ) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'no_show', no_show_marked_by = ?, no_show_marked_at = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(marked_by)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Record the outcome of a payment check. Only applies while the payment is pending.
    pub async fn record_payment_verification<'e, E>(
        executor: E,
        id: &str,
        outcome: PaymentStatus,
        verifier_id: &str,
        notes: Option<&str>,
    ) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET payment_status = ?, payment_verified_by = ?, payment_verified_at = ?,
                payment_notes = ?, updated_at = ?
            WHERE id = ? AND payment_status = 'pending'
            "#,
        )
        .bind(outcome)
        .bind(verifier_id)
        .bind(now)
        .bind(notes)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Attach a payment slip and put the payment back in the verification queue.
    pub async fn set_payment_slip(pool: &SqlitePool, id: &str, url: &str) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET payment_slip_url = ?, payment_status = 'pending',
                payment_verified_by = NULL, payment_verified_at = NULL, updated_at = ?
            WHERE id = ? AND payment_status != 'paid'
            "#,
        )
        .bind(url)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Move pending reservations whose window has already ended to `expired`.
    pub async fn expire_stale(pool: &SqlitePool, now: NaiveDateTime) -> AppResult<u64> {
        let stamp = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'expired', updated_at = ?
            WHERE status = 'pending' AND end_time < ?
            "#,
        )
        .bind(stamp)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
