use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::push_user_match;
use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Report Repository
// ============================================================================

pub struct ReportRepository;

/// Upper bound on rows returned by the usage history page.
pub const USAGE_HISTORY_LIMIT: i64 = 200;

/// How many offenders the no-show report ranks.
pub const TOP_OFFENDERS: i64 = 10;

#[derive(Debug, Clone, Default)]
pub struct NoShowFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub facility_id: Option<String>,
    pub user_query: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSort {
    #[default]
    Latest,
    Oldest,
}

impl UsageSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "latest" => Some(UsageSort::Latest),
            "oldest" => Some(UsageSort::Oldest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UsageFilter {
    pub facility_id: Option<String>,
    pub status: Option<UsageStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub user_query: Option<String>,
    pub sort: UsageSort,
}

fn push_no_show_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &NoShowFilter) {
    if let Some(from) = filter.date_from {
        builder.push(" AND date(r.start_time) >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND date(r.start_time) <= ").push_bind(to);
    }
    if let Some(facility_id) = &filter.facility_id {
        builder
            .push(" AND r.facility_id = ")
            .push_bind(facility_id.clone());
    }
    if let Some(query) = &filter.user_query {
        push_user_match(builder, query);
    }
}

impl ReportRepository {
    // ========================================================================
    // No-shows
    // ========================================================================

    pub async fn no_show_summary(
        pool: &SqlitePool,
        filter: &NoShowFilter,
    ) -> AppResult<NoShowSummary> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                COUNT(*) AS total_no_shows,
                COALESCE(SUM(r.total_amount), 0.0) AS revenue_lost,
                COUNT(DISTINCT r.user_id) AS unique_users,
                COUNT(DISTINCT r.facility_id) AS facilities_affected
            FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE r.status = 'no_show'
            "#,
        );
        push_no_show_filters(&mut builder, filter);

        builder
            .build_query_as::<NoShowSummary>()
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn top_no_show_offenders(
        pool: &SqlitePool,
        filter: &NoShowFilter,
    ) -> AppResult<Vec<NoShowOffender>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                r.user_id AS user_id,
                u.full_name AS user_name,
                u.email AS user_email,
                COUNT(*) AS no_show_count,
                COALESCE(SUM(r.total_amount), 0.0) AS revenue_lost
            FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE r.status = 'no_show'
            "#,
        );
        push_no_show_filters(&mut builder, filter);
        builder
            .push(
                " GROUP BY r.user_id, u.full_name, u.email \
                 ORDER BY no_show_count DESC, revenue_lost DESC LIMIT ",
            )
            .push_bind(TOP_OFFENDERS);

        builder
            .build_query_as::<NoShowOffender>()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    // ========================================================================
    // Usage history
    // ========================================================================

    /// The most recent matching usage logs (at most [`USAGE_HISTORY_LIMIT`]),
    /// ordered per `filter.sort`.
    pub async fn usage_history(
        pool: &SqlitePool,
        filter: &UsageFilter,
    ) -> AppResult<Vec<UsageHistoryEntry>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT * FROM (
                SELECT
                    l.id, l.reservation_id,
                    r.facility_id, f.name AS facility_name,
                    r.user_id, u.full_name AS user_name, u.email AS user_email,
                    r.status AS reservation_status, r.start_time, r.end_time,
                    l.started_at, l.completed_at, l.duration_minutes, l.status,
                    l.total_amount, l.verified_at,
                    COALESCE(l.completed_at, r.end_time) AS sort_key
                FROM usage_logs l
                JOIN reservations r ON r.id = l.reservation_id
                JOIN facilities f ON f.id = r.facility_id
                JOIN users u ON u.id = r.user_id
                WHERE 1 = 1
            "#,
        );

        if let Some(facility_id) = &filter.facility_id {
            builder
                .push(" AND r.facility_id = ")
                .push_bind(facility_id.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND l.status = ").push_bind(status);
        }
        if let Some(from) = filter.date_from {
            builder
                .push(" AND date(COALESCE(l.completed_at, r.end_time)) >= ")
                .push_bind(from);
        }
        if let Some(to) = filter.date_to {
            builder
                .push(" AND date(COALESCE(l.completed_at, r.end_time)) <= ")
                .push_bind(to);
        }
        if let Some(query) = &filter.user_query {
            push_user_match(&mut builder, query);
        }

        builder
            .push(" ORDER BY sort_key DESC LIMIT ")
            .push_bind(USAGE_HISTORY_LIMIT)
            .push(") ");

        match filter.sort {
            UsageSort::Latest => builder.push("ORDER BY sort_key DESC"),
            UsageSort::Oldest => builder.push("ORDER BY sort_key ASC"),
        };

        builder
            .build_query_as::<UsageHistoryEntry>()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    // ========================================================================
    // Dashboard
    // ========================================================================

    pub async fn dashboard(
        pool: &SqlitePool,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<DashboardStats> {
        let reservations_by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM reservations
            WHERE (? IS NULL OR date(start_time) >= ?)
              AND (? IS NULL OR date(start_time) <= ?)
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(date_from)
        .bind(date_from)
        .bind(date_to)
        .bind(date_to)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let total_reservations = reservations_by_status.iter().map(|s| s.count).sum();

        let (pending_payment_verifications, paid_revenue) = sqlx::query_as::<_, (i64, f64)>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN payment_status = 'pending' AND payment_slip_url IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN total_amount ELSE 0.0 END), 0.0)
            FROM reservations
            WHERE (? IS NULL OR date(start_time) >= ?)
              AND (? IS NULL OR date(start_time) <= ?)
            "#,
        )
        .bind(date_from)
        .bind(date_from)
        .bind(date_to)
        .bind(date_to)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        let (active_facilities, closed_facilities) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_closed_for_event = 1 THEN 1 ELSE 0 END), 0)
            FROM facilities
            "#,
        )
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        let active_events = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM facility_events WHERE is_active = 1 AND end_date >= ?",
        )
        .bind(today)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(DashboardStats {
            reservations_by_status,
            total_reservations,
            pending_payment_verifications,
            paid_revenue,
            active_facilities,
            closed_facilities,
            active_events,
        })
    }
}
