use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::db::{
    ReservationRepository, ReservationStatus, UsageLog, UsageLogRepository, UsageStatus,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub struct UsageManager;

impl UsageManager {
    /// Open a usage log for a confirmed reservation.
    pub async fn start_usage(
        state: &Arc<AppState>,
        reservation_id: &str,
        now: NaiveDateTime,
    ) -> AppResult<UsageLog> {
        let reservation = ReservationRepository::find_by_id(&state.db, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))?;

        if reservation.status != ReservationStatus::Confirmed {
            return Err(AppError::Conflict(i18n::t(
                "conflict.usage_requires_confirmed",
            )));
        }
        if UsageLogRepository::find_active_for_reservation(&state.db, reservation_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(i18n::t("conflict.usage_already_active")));
        }

        let log =
            UsageLogRepository::create(&state.db, reservation_id, now, reservation.total_amount)
                .await?;
        tracing::info!("Usage {} started for reservation {}", log.id, reservation_id);
        Ok(log)
    }

    /// Close an active log and complete its reservation in one transaction.
    pub async fn complete_usage(
        state: &Arc<AppState>,
        log_id: &str,
        now: NaiveDateTime,
    ) -> AppResult<UsageLog> {
        let mut tx = state.db.begin().await.map_err(AppError::Database)?;

        let log = UsageLogRepository::find_by_id(&mut *tx, log_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.usage_log")))?;
        if log.status != UsageStatus::Active {
            return Err(AppError::Conflict(i18n::t("conflict.usage_not_active")));
        }

        let reservation = ReservationRepository::find_by_id(&mut *tx, &log.reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))?;
        if !reservation
            .status
            .can_transition_to(ReservationStatus::Completed)
        {
            return Err(AppError::Conflict(i18n::t_with(
                "conflict.illegal_transition",
                &[
                    ("from", reservation.status.as_str()),
                    ("to", ReservationStatus::Completed.as_str()),
                ],
            )));
        }

        let duration_minutes = (now - log.started_at).num_minutes().max(0);

        let changed = UsageLogRepository::complete(
            &mut *tx,
            log_id,
            now,
            duration_minutes,
            reservation.total_amount,
        )
        .await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.usage_not_active")));
        }

        let changed = ReservationRepository::update_status(
            &mut *tx,
            &reservation.id,
            reservation.status,
            ReservationStatus::Completed,
        )
        .await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.status_changed")));
        }

        let log = UsageLogRepository::find_by_id(&mut *tx, log_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.usage_log")))?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Usage {} completed after {} minutes",
            log_id,
            duration_minutes
        );
        Ok(log)
    }

    pub async fn verify_usage(
        state: &Arc<AppState>,
        log_id: &str,
        verifier_id: &str,
        notes: Option<&str>,
    ) -> AppResult<UsageLog> {
        let log = UsageLogRepository::find_by_id(&state.db, log_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.usage_log")))?;
        if log.status != UsageStatus::Completed {
            return Err(AppError::Conflict(i18n::t("conflict.usage_not_completed")));
        }

        let changed = UsageLogRepository::verify(&state.db, log_id, verifier_id, notes).await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.usage_not_completed")));
        }

        tracing::info!("Usage {} verified by {}", log_id, verifier_id);
        UsageLogRepository::find_by_id(&state.db, log_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.usage_log")))
    }
}
