use std::sync::Arc;

use serde::Serialize;

use crate::db::{PaymentStatus, Reservation, ReservationRepository, ReservationStatus};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

const MAX_SLIP_URL_LEN: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub reservation: Reservation,
    /// Set when the approval also confirmed a pending reservation.
    pub auto_confirmed: bool,
}

pub struct PaymentManager;

impl PaymentManager {
    /// Approve or reject the payment slip attached to a reservation.
    ///
    /// The reservation status is left alone unless `AUTO_CONFIRM_ON_PAYMENT`
    /// is enabled, in which case an approval also confirms a pending reservation.
    pub async fn verify_payment(
        state: &Arc<AppState>,
        reservation_id: &str,
        verifier_id: &str,
        approved: bool,
        notes: Option<&str>,
    ) -> AppResult<PaymentOutcome> {
        let reservation = ReservationRepository::find_by_id(&state.db, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))?;

        match reservation.payment_status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => {
                return Err(AppError::Conflict(i18n::t("conflict.payment_already_paid")))
            }
            PaymentStatus::Rejected => {
                return Err(AppError::Conflict(i18n::t("conflict.payment_not_pending")))
            }
        }

        let has_slip = reservation
            .payment_slip_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if !has_slip {
            return Err(AppError::Validation(i18n::t("conflict.payment_no_slip")));
        }

        let outcome = if approved {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Rejected
        };

        let mut tx = state.db.begin().await.map_err(AppError::Database)?;

        let changed = ReservationRepository::record_payment_verification(
            &mut *tx,
            reservation_id,
            outcome,
            verifier_id,
            notes,
        )
        .await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.payment_not_pending")));
        }

        // Only a reservation still pending is confirmed; anything else keeps
        // its status and the approval stands.
        let auto_confirm = approved
            && state.config.payments.auto_confirm_on_payment
            && ReservationRepository::update_status(
                &mut *tx,
                reservation_id,
                ReservationStatus::Pending,
                ReservationStatus::Confirmed,
            )
            .await?
                == 1;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Payment for reservation {} marked {} by {}{}",
            reservation_id,
            outcome.as_str(),
            verifier_id,
            if auto_confirm { "; reservation confirmed" } else { "" }
        );

        let reservation = ReservationRepository::find_by_id(&state.db, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))?;

        Ok(PaymentOutcome {
            reservation,
            auto_confirmed: auto_confirm,
        })
    }

    /// Accepts absolute http(s) URLs and paths under `/uploads/`.
    pub fn validate_slip_url(raw: &str) -> AppResult<String> {
        let value = raw.trim();
        if value.is_empty() || value.len() > MAX_SLIP_URL_LEN {
            return Err(AppError::Validation(i18n::t("validation.slip_url")));
        }

        if let Some(path) = value.strip_prefix("/uploads/") {
            if path.is_empty() || path.split('/').any(|seg| seg == "..") {
                return Err(AppError::Validation(i18n::t("validation.slip_url")));
            }
            return Ok(value.to_string());
        }

        match url::Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                Ok(value.to_string())
            }
            _ => Err(AppError::Validation(i18n::t("validation.slip_url"))),
        }
    }

    /// Attach a payment slip to one of the caller's reservations. A rejected
    /// payment goes back to `pending` for another review.
    pub async fn submit_payment_slip(
        state: &Arc<AppState>,
        reservation_id: &str,
        owner_id: &str,
        slip_url: &str,
    ) -> AppResult<Reservation> {
        let slip_url = Self::validate_slip_url(slip_url)?;

        let reservation = ReservationRepository::find_by_id(&state.db, reservation_id)
            .await?
            .filter(|r| r.user_id == owner_id)
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))?;

        if reservation.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict(i18n::t("conflict.payment_already_paid")));
        }
        if reservation.status.is_terminal() {
            return Err(AppError::Conflict(i18n::t_with(
                "conflict.reservation_closed",
                &[("status", reservation.status.as_str())],
            )));
        }

        let changed =
            ReservationRepository::set_payment_slip(&state.db, reservation_id, &slip_url).await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.payment_already_paid")));
        }

        tracing::info!("Payment slip submitted for reservation {}", reservation_id);

        ReservationRepository::find_by_id(&state.db, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))
    }
}
