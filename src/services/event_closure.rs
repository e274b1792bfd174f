//! Facility closures driven by calendar events.
//!
//! `facilities.is_closed_for_event` (plus reason and end date) is a
//! denormalized copy of the event table. Every write to `facility_events` goes
//! through this module and recomputes the copy for the affected facilities in
//! the same transaction:
//!
//! a facility is closed iff at least one active event whose `end_date` is
//! today or later lists it. The reason and end date shown are those of the
//! listing event that ends last.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::db::{FacilityEvent, FacilityEventInput, FacilityEventRepository, FacilityRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

const MAX_TITLE_LEN: usize = 200;

/// Result of recomputing closure state for a set of facilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub closed: usize,
    pub reopened: usize,
}

pub struct EventClosureService;

impl EventClosureService {
    /// Trim and check an event form. Facility ids are deduplicated, keeping order.
    pub fn validate(input: FacilityEventInput) -> AppResult<FacilityEventInput> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation(i18n::t_with(
                "validation.required",
                &[("field", "Title")],
            )));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(i18n::t_with(
                "validation.too_long",
                &[("field", "Title"), ("max", "200")],
            )));
        }

        let mut seen = BTreeSet::new();
        let facility_ids: Vec<String> = input
            .facility_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if facility_ids.is_empty() {
            return Err(AppError::Validation(i18n::t(
                "validation.facilities_required",
            )));
        }

        if input.end_date < input.start_date {
            return Err(AppError::Validation(i18n::t("validation.date_range")));
        }
        match (input.start_time, input.end_time) {
            (Some(start), Some(end)) if input.start_date == input.end_date && end <= start => {
                return Err(AppError::Validation(i18n::t("validation.time_range")));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::Validation(i18n::t("validation.time_pair")));
            }
            _ => {}
        }

        Ok(FacilityEventInput {
            title,
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            facility_ids,
            ..input
        })
    }

    async fn ensure_facilities_exist(conn: &mut SqliteConnection, ids: &[String]) -> AppResult<()> {
        let found = FacilityRepository::count_existing(&mut *conn, ids).await?;
        if found != ids.len() as i64 {
            return Err(AppError::Validation(i18n::t(
                "validation.unknown_facilities",
            )));
        }
        Ok(())
    }

    /// Recompute the closure columns of `facility_ids` from the active events.
    pub async fn reconcile_facilities(
        conn: &mut SqliteConnection,
        facility_ids: &[String],
        today: NaiveDate,
    ) -> AppResult<ReconcileSummary> {
        // Ordered by end_date DESC, so the first match is the one that ends last
        let events = FacilityEventRepository::list_active_not_lapsed(&mut *conn, today).await?;

        let mut summary = ReconcileSummary::default();
        for facility_id in facility_ids {
            match events.iter().find(|e| e.lists_facility(facility_id)) {
                Some(event) => {
                    FacilityRepository::apply_closure(
                        &mut *conn,
                        facility_id,
                        &event.title,
                        event.end_date,
                    )
                    .await?;
                    summary.closed += 1;
                }
                None => {
                    FacilityRepository::clear_closure(&mut *conn, facility_id).await?;
                    summary.reopened += 1;
                }
            }
        }

        tracing::debug!(
            "Reconciled {} facilities: {} closed, {} open",
            facility_ids.len(),
            summary.closed,
            summary.reopened
        );
        Ok(summary)
    }

    pub async fn add_event(
        state: &Arc<AppState>,
        input: FacilityEventInput,
        created_by: &str,
        today: NaiveDate,
    ) -> AppResult<(FacilityEvent, ReconcileSummary)> {
        let input = Self::validate(input)?;

        let mut tx = state.db.begin().await.map_err(AppError::Database)?;
        Self::ensure_facilities_exist(&mut tx, &input.facility_ids).await?;

        let event = FacilityEventRepository::insert(&mut *tx, &input, created_by).await?;
        let summary = Self::reconcile_facilities(&mut tx, &event.facility_ids, today).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Event {} created by {}; {} facilities closed",
            event.id,
            created_by,
            summary.closed
        );
        Ok((event, summary))
    }

    /// Rewrite an event, then reconcile the union of its old and new facilities.
    pub async fn update_event(
        state: &Arc<AppState>,
        event_id: &str,
        input: FacilityEventInput,
        today: NaiveDate,
    ) -> AppResult<FacilityEvent> {
        let input = Self::validate(input)?;

        let mut tx = state.db.begin().await.map_err(AppError::Database)?;
        let previous = FacilityEventRepository::find_by_id(&mut *tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.event")))?;
        Self::ensure_facilities_exist(&mut tx, &input.facility_ids).await?;

        FacilityEventRepository::update(&mut *tx, event_id, &input).await?;

        let affected = union_ids(&previous.facility_ids, &input.facility_ids);
        Self::reconcile_facilities(&mut tx, &affected, today).await?;

        let event = FacilityEventRepository::find_by_id(&mut *tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.event")))?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Event {} updated", event_id);
        Ok(event)
    }

    /// Delete an event and reopen facilities nothing else keeps closed.
    /// Returns the deleted row.
    pub async fn delete_event(
        state: &Arc<AppState>,
        event_id: &str,
        today: NaiveDate,
    ) -> AppResult<FacilityEvent> {
        let mut tx = state.db.begin().await.map_err(AppError::Database)?;
        let event = FacilityEventRepository::find_by_id(&mut *tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.event")))?;

        FacilityEventRepository::delete(&mut *tx, event_id).await?;
        Self::reconcile_facilities(&mut tx, &event.facility_ids, today).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Event {} deleted", event_id);
        Ok(event)
    }

    pub async fn toggle_event_status(
        state: &Arc<AppState>,
        event_id: &str,
        today: NaiveDate,
    ) -> AppResult<FacilityEvent> {
        let mut tx = state.db.begin().await.map_err(AppError::Database)?;
        let event = FacilityEventRepository::find_by_id(&mut *tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.event")))?;

        FacilityEventRepository::set_active(&mut *tx, event_id, !event.is_active).await?;
        Self::reconcile_facilities(&mut tx, &event.facility_ids, today).await?;

        let event = FacilityEventRepository::find_by_id(&mut *tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.event")))?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Event {} is now {}",
            event_id,
            if event.is_active { "active" } else { "inactive" }
        );
        Ok(event)
    }

    /// Reconcile facilities whose recorded closure has already ended.
    pub async fn reconcile_lapsed(
        state: &Arc<AppState>,
        today: NaiveDate,
    ) -> AppResult<ReconcileSummary> {
        let lapsed = FacilityRepository::list_lapsed_closures(&state.db, today).await?;
        if lapsed.is_empty() {
            return Ok(ReconcileSummary::default());
        }

        let mut tx = state.db.begin().await.map_err(AppError::Database)?;
        let summary = Self::reconcile_facilities(&mut tx, &lapsed, today).await?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(summary)
    }
}

fn union_ids(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    a.iter()
        .chain(b.iter())
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
