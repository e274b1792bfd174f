use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::db::{
    BookingType, CreateReservation, FacilityEventRepository, FacilityRepository,
    PricingOptionRepository, Reservation, ReservationRepository, ReservationStatus,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

/// A booking as submitted by a customer, before pricing.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub facility_id: String,
    pub pricing_option_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub booking_type: BookingType,
    pub attendees: i64,
    pub purpose: Option<String>,
}

pub struct ReservationService;

impl ReservationService {
    async fn load(state: &Arc<AppState>, reservation_id: &str) -> AppResult<Reservation> {
        ReservationRepository::find_by_id(&state.db, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))
    }

    fn check_transition(from: ReservationStatus, to: ReservationStatus) -> AppResult<()> {
        if from.can_transition_to(to) {
            return Ok(());
        }
        Err(AppError::Conflict(i18n::t_with(
            "conflict.illegal_transition",
            &[("from", from.as_str()), ("to", to.as_str())],
        )))
    }

    /// Move a reservation to `new_status` if the transition table allows it.
    /// `no_show` goes through [`ReservationService::mark_no_show`].
    pub async fn update_status(
        state: &Arc<AppState>,
        reservation_id: &str,
        new_status: ReservationStatus,
        actor_id: &str,
    ) -> AppResult<Reservation> {
        if new_status == ReservationStatus::NoShow {
            return Self::mark_no_show(state, reservation_id, actor_id).await;
        }

        let reservation = Self::load(state, reservation_id).await?;
        Self::check_transition(reservation.status, new_status)?;

        let changed = ReservationRepository::update_status(
            &state.db,
            reservation_id,
            reservation.status,
            new_status,
        )
        .await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.status_changed")));
        }

        tracing::info!(
            "Reservation {} moved {} -> {} by {}",
            reservation_id,
            reservation.status.as_str(),
            new_status.as_str(),
            actor_id
        );

        Self::load(state, reservation_id).await
    }

    /// Record that the customer did not show up, stamping who marked it and when.
    pub async fn mark_no_show(
        state: &Arc<AppState>,
        reservation_id: &str,
        actor_id: &str,
    ) -> AppResult<Reservation> {
        let reservation = Self::load(state, reservation_id).await?;
        Self::check_transition(reservation.status, ReservationStatus::NoShow)?;

        let changed = ReservationRepository::mark_no_show(
            &state.db,
            reservation_id,
            reservation.status,
            actor_id,
        )
        .await?;
        if changed == 0 {
            return Err(AppError::Conflict(i18n::t("conflict.status_changed")));
        }

        tracing::info!("Reservation {} marked no-show by {}", reservation_id, actor_id);
        Self::load(state, reservation_id).await
    }

    /// Price of a booking window. Partial hours and days are charged in full.
    pub fn compute_total(
        booking_type: BookingType,
        start: NaiveDateTime,
        end: NaiveDateTime,
        hourly_price: f64,
        daily_rate: f64,
    ) -> f64 {
        let minutes = (end - start).num_minutes().max(0);
        match booking_type {
            BookingType::Hourly => {
                let hours = (minutes + 59) / 60;
                hours as f64 * hourly_price
            }
            BookingType::Daily => {
                let days = ((minutes + 1439) / 1440).max(1);
                days as f64 * daily_rate
            }
        }
    }

    /// Title of an active event listing the facility whose dates intersect the
    /// booking's days.
    async fn closing_event(
        state: &Arc<AppState>,
        facility_id: &str,
        request: &BookingRequest,
        now: NaiveDateTime,
    ) -> AppResult<Option<String>> {
        let first_day = request.start_time.date();
        // A booking ending at midnight does not occupy the next day
        let last_day = (request.end_time - Duration::seconds(1)).date().max(first_day);

        let events = FacilityEventRepository::list_active_not_lapsed(&state.db, now.date()).await?;
        Ok(events
            .into_iter()
            .find(|e| {
                e.lists_facility(facility_id)
                    && e.start_date <= last_day
                    && first_day <= e.end_date
            })
            .map(|e| e.title))
    }

    pub async fn create_reservation(
        state: &Arc<AppState>,
        user_id: &str,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> AppResult<Reservation> {
        if request.end_time <= request.start_time {
            return Err(AppError::Validation(i18n::t("validation.booking_range")));
        }
        if request.start_time < now {
            return Err(AppError::Validation(i18n::t("validation.booking_in_past")));
        }
        if request.attendees < 1 {
            return Err(AppError::Validation(i18n::t("validation.attendees")));
        }

        let facility = FacilityRepository::find_by_id(&state.db, &request.facility_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.facility")))?;

        if !facility.is_active {
            return Err(AppError::Conflict(i18n::t("conflict.facility_unavailable")));
        }
        if facility.is_closed_for_event {
            if let Some(title) = Self::closing_event(state, &facility.id, &request, now).await? {
                return Err(AppError::Conflict(i18n::t_with(
                    "conflict.facility_closed",
                    &[("reason", title.as_str())],
                )));
            }
        }

        let mut hourly_price = facility.hourly_rate;
        if let Some(option_id) = &request.pricing_option_id {
            let option = PricingOptionRepository::find_by_id(&state.db, option_id)
                .await?
                .ok_or_else(|| AppError::NotFound(i18n::t("not_found.pricing_option")))?;
            if option.facility_id != facility.id || !option.is_active {
                return Err(AppError::Validation(i18n::t(
                    "conflict.pricing_option_mismatch",
                )));
            }
            hourly_price = option.price_per_hour;
        }

        let total_amount = Self::compute_total(
            request.booking_type,
            request.start_time,
            request.end_time,
            hourly_price,
            facility.daily_rate,
        );

        let reservation = ReservationRepository::create(
            &state.db,
            &CreateReservation {
                user_id: user_id.to_string(),
                facility_id: facility.id.clone(),
                pricing_option_id: request.pricing_option_id,
                start_time: request.start_time,
                end_time: request.end_time,
                total_amount,
                booking_type: request.booking_type,
                attendees: request.attendees,
                purpose: request.purpose,
            },
        )
        .await?
        .ok_or_else(|| AppError::Conflict(i18n::t("conflict.slot_taken")))?;

        tracing::info!(
            "Reservation {} created for facility {} by user {}",
            reservation.id,
            facility.id,
            user_id
        );
        Ok(reservation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;
    use crate::db::{PaymentStatus, PricingOptionInput, Role};

    struct Fixture {
        state: Arc<AppState>,
        admin_id: String,
        user_id: String,
        facility_id: String,
    }

    async fn fixture() -> Fixture {
        let state = test_state().await;
        let admin = seed_user(&state.db, "admin@example.com", Role::Admin).await;
        let user = seed_user(&state.db, "guest@example.com", Role::User).await;
        let category = seed_category(&state.db, "Courts").await;
        let facility = seed_facility(&state.db, &category.id, "Court 1").await;
        Fixture {
            state,
            admin_id: admin.id,
            user_id: user.id,
            facility_id: facility.id,
        }
    }

    #[tokio::test]
    async fn confirms_pending_reservation() {
        let f = fixture().await;
        let r = SeedReservation::new(&f.user_id, &f.facility_id, "2024-03-01 10:00", "2024-03-01 12:00")
            .insert(&f.state.db)
            .await;

        let updated = ReservationService::update_status(
            &f.state,
            &r.id,
            ReservationStatus::Confirmed,
            &f.admin_id,
        )
        .await
        .unwrap();
        assert_eq!(updated.status, ReservationStatus::Confirmed);
        assert_eq!(updated.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn no_show_records_marker() {
        let f = fixture().await;
        let r = SeedReservation::new(&f.user_id, &f.facility_id, "2024-03-01 10:00", "2024-03-01 12:00")
            .status(ReservationStatus::Confirmed)
            .insert(&f.state.db)
            .await;

        let updated =
            ReservationService::update_status(&f.state, &r.id, ReservationStatus::NoShow, &f.admin_id)
                .await
                .unwrap();
        assert_eq!(updated.status, ReservationStatus::NoShow);
        assert_eq!(updated.no_show_marked_by.as_deref(), Some(f.admin_id.as_str()));
        assert!(updated.no_show_marked_at.is_some());
    }

    #[tokio::test]
    async fn no_show_unreachable_from_completed() {
        let f = fixture().await;
        let r = SeedReservation::new(&f.user_id, &f.facility_id, "2024-03-01 10:00", "2024-03-01 12:00")
            .status(ReservationStatus::Completed)
            .insert(&f.state.db)
            .await;

        let err = ReservationService::mark_no_show(&f.state, &r.id, &f.admin_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let unchanged = ReservationRepository::find_by_id(&f.state.db, &r.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.status, ReservationStatus::Completed);
        assert!(unchanged.no_show_marked_by.is_none());
    }

    #[tokio::test]
    async fn illegal_transitions_leave_row_unchanged() {
        let f = fixture().await;
        let cancelled =
            SeedReservation::new(&f.user_id, &f.facility_id, "2024-03-01 10:00", "2024-03-01 12:00")
                .status(ReservationStatus::Cancelled)
                .insert(&f.state.db)
                .await;

        let err = ReservationService::update_status(
            &f.state,
            &cancelled.id,
            ReservationStatus::Confirmed,
            &f.admin_id,
        )
        .await
        .unwrap_err();
        match err {
            AppError::Conflict(msg) => {
                assert!(msg.contains("cancelled"));
                assert!(msg.contains("confirmed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let reloaded = ReservationRepository::find_by_id(&f.state.db, &cancelled.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, ReservationStatus::Cancelled);
        assert_eq!(reloaded.updated_at, cancelled.updated_at);
    }

    #[tokio::test]
    async fn same_status_is_rejected() {
        let f = fixture().await;
        let r = SeedReservation::new(&f.user_id, &f.facility_id, "2024-03-01 10:00", "2024-03-01 12:00")
            .insert(&f.state.db)
            .await;
        let err =
            ReservationService::update_status(&f.state, &r.id, ReservationStatus::Pending, &f.admin_id)
                .await
                .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_reservation_is_not_found() {
        let f = fixture().await;
        let err = ReservationService::update_status(
            &f.state,
            "missing",
            ReservationStatus::Confirmed,
            &f.admin_id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn totals_round_up_partial_units() {
        let start = dt("2024-03-01 10:00");
        assert_eq!(
            ReservationService::compute_total(
                BookingType::Hourly,
                start,
                dt("2024-03-01 11:30"),
                100.0,
                800.0
            ),
            200.0
        );
        assert_eq!(
            ReservationService::compute_total(
                BookingType::Hourly,
                start,
                dt("2024-03-01 12:00"),
                100.0,
                800.0
            ),
            200.0
        );
        assert_eq!(
            ReservationService::compute_total(
                BookingType::Daily,
                start,
                dt("2024-03-02 12:00"),
                100.0,
                800.0
            ),
            1600.0
        );
        assert_eq!(
            ReservationService::compute_total(
                BookingType::Daily,
                start,
                dt("2024-03-01 11:00"),
                100.0,
                800.0
            ),
            800.0
        );
    }

    fn booking(facility_id: &str, start: NaiveDateTime, hours: i64) -> BookingRequest {
        BookingRequest {
            facility_id: facility_id.to_string(),
            pricing_option_id: None,
            start_time: start,
            end_time: start + Duration::hours(hours),
            booking_type: BookingType::Hourly,
            attendees: 2,
            purpose: Some("Training".to_string()),
        }
    }

    #[tokio::test]
    async fn create_reservation_prices_and_rejects_overlap() {
        let f = fixture().await;
        let now = dt("2024-03-01 08:00");
        let start = dt("2024-03-05 10:00");

        let created =
            ReservationService::create_reservation(&f.state, &f.user_id, booking(&f.facility_id, start, 2), now)
                .await
                .unwrap();
        assert_eq!(created.status, ReservationStatus::Pending);
        assert_eq!(created.payment_status, PaymentStatus::Pending);
        assert_eq!(created.total_amount, 200.0);

        let err = ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, start + Duration::hours(1), 2),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Back-to-back is fine
        ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, start + Duration::hours(2), 1),
            now,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn create_reservation_uses_pricing_option_rate() {
        let f = fixture().await;
        let option = PricingOptionRepository::create(
            &f.state.db,
            &PricingOptionInput {
                facility_id: f.facility_id.clone(),
                name: "Member".to_string(),
                price_per_hour: 60.0,
                sort_order: 0,
                is_active: true,
            },
        )
        .await
        .unwrap();

        let mut request = booking(&f.facility_id, dt("2024-03-05 10:00"), 3);
        request.pricing_option_id = Some(option.id.clone());

        let created = ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            request,
            dt("2024-03-01 08:00"),
        )
        .await
        .unwrap();
        assert_eq!(created.total_amount, 180.0);
        assert_eq!(created.pricing_option_id.as_deref(), Some(option.id.as_str()));
    }

    #[tokio::test]
    async fn create_reservation_validates_window() {
        let f = fixture().await;
        let now = dt("2024-03-01 08:00");

        let err = ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, dt("2024-03-05 10:00"), 0),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, dt("2024-02-05 10:00"), 1),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_reservation_refuses_only_event_days() {
        use crate::db::FacilityEventInput;
        use crate::services::event_closure::EventClosureService;

        let f = fixture().await;
        let day = |m: u32, d: u32| chrono::NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        let now = dt("2024-05-30 08:00");
        for (title, start, end) in [
            ("Cleaning", day(6, 1), day(6, 3)),
            ("Tournament", day(6, 20), day(6, 25)),
        ] {
            EventClosureService::add_event(
                &f.state,
                FacilityEventInput {
                    title: title.to_string(),
                    description: None,
                    facility_ids: vec![f.facility_id.clone()],
                    start_date: start,
                    end_date: end,
                    start_time: None,
                    end_time: None,
                },
                &f.admin_id,
                now.date(),
            )
            .await
            .unwrap();
        }

        let refused = |res: AppResult<Reservation>, title: &str| match res {
            Err(AppError::Conflict(msg)) => assert!(msg.contains(title), "{}", msg),
            other => panic!("expected closure conflict, got {:?}", other),
        };

        let res = ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, dt("2024-06-02 10:00"), 1),
            now,
        )
        .await;
        refused(res, "Cleaning");

        let res = ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, dt("2024-06-21 10:00"), 1),
            now,
        )
        .await;
        refused(res, "Tournament");

        // Between the two events and after the last one the facility is bookable
        for start in ["2024-06-10 10:00", "2024-06-26 10:00"] {
            ReservationService::create_reservation(
                &f.state,
                &f.user_id,
                booking(&f.facility_id, dt(start), 1),
                now,
            )
            .await
            .unwrap();
        }

        // A booking ending at midnight before the event starts is fine
        ReservationService::create_reservation(
            &f.state,
            &f.user_id,
            booking(&f.facility_id, dt("2024-06-19 22:00"), 2),
            now,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn concurrent_bookings_of_one_slot_take_it_once() {
        let f = fixture().await;
        let now = dt("2024-03-01 08:00");
        let start = dt("2024-03-05 10:00");

        let (a, b) = tokio::join!(
            ReservationService::create_reservation(
                &f.state,
                &f.user_id,
                booking(&f.facility_id, start, 2),
                now
            ),
            ReservationService::create_reservation(
                &f.state,
                &f.user_id,
                booking(&f.facility_id, start, 2),
                now
            ),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, AppError::Conflict(_)));

        let rows = reservation_count(&f.state, &f.facility_id).await;
        assert_eq!(rows, 1);
    }

    async fn reservation_count(state: &Arc<AppState>, facility_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE facility_id = ?")
            .bind(facility_id)
            .fetch_one(&state.db)
            .await
            .unwrap()
    }
}
