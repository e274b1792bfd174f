use std::sync::Arc;

use chrono::NaiveDate;

use crate::db::{
    DashboardStats, NoShowFilter, NoShowReport, ReportRepository, ReservationDetail,
    ReservationFilter, ReservationRepository, ReservationStatus, UsageFilter, UsageHistoryEntry,
};
use crate::error::AppResult;
use crate::AppState;

/// Upper bound on rows in the admin reservation list.
pub const RESERVATION_LIST_LIMIT: i64 = 500;

pub struct ReportService;

impl ReportService {
    /// No-show reservations in range with their aggregates and the top offenders.
    pub async fn no_show_report(
        state: &Arc<AppState>,
        filter: &NoShowFilter,
    ) -> AppResult<NoShowReport> {
        let summary = ReportRepository::no_show_summary(&state.db, filter).await?;
        let offenders = ReportRepository::top_no_show_offenders(&state.db, filter).await?;

        let reservations = ReservationRepository::list(
            &state.db,
            &ReservationFilter {
                status: Some(ReservationStatus::NoShow),
                facility_id: filter.facility_id.clone(),
                user_query: filter.user_query.clone(),
                date_from: filter.date_from,
                date_to: filter.date_to,
                ..Default::default()
            },
            RESERVATION_LIST_LIMIT,
        )
        .await?;

        Ok(NoShowReport {
            summary,
            offenders,
            reservations,
        })
    }

    pub async fn usage_history(
        state: &Arc<AppState>,
        filter: &UsageFilter,
    ) -> AppResult<Vec<UsageHistoryEntry>> {
        ReportRepository::usage_history(&state.db, filter).await
    }

    pub async fn dashboard(
        state: &Arc<AppState>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<DashboardStats> {
        ReportRepository::dashboard(&state.db, date_from, date_to, today).await
    }

    pub async fn reservation_list(
        state: &Arc<AppState>,
        filter: &ReservationFilter,
    ) -> AppResult<Vec<ReservationDetail>> {
        ReservationRepository::list(&state.db, filter, RESERVATION_LIST_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;
    use crate::db::{PaymentStatus, Role, UsageSort, UsageStatus};
    use crate::services::usage::UsageManager;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn no_show_report_respects_inclusive_range() {
        let state = test_state().await;
        let alice = seed_user(&state.db, "alice@example.com", Role::User).await;
        let bob = seed_user(&state.db, "bob@example.com", Role::User).await;
        let category = seed_category(&state.db, "Courts").await;
        let court1 = seed_facility(&state.db, &category.id, "Court 1").await;
        let court2 = seed_facility(&state.db, &category.id, "Court 2").await;

        let no_show = ReservationStatus::NoShow;
        // In range, including both boundary days
        SeedReservation::new(&alice.id, &court1.id, "2024-01-01 08:00", "2024-01-01 09:00")
            .status(no_show)
            .amount(100.0)
            .insert(&state.db)
            .await;
        SeedReservation::new(&alice.id, &court2.id, "2024-01-31 20:00", "2024-01-31 21:00")
            .status(no_show)
            .amount(150.0)
            .insert(&state.db)
            .await;
        SeedReservation::new(&bob.id, &court1.id, "2024-01-15 10:00", "2024-01-15 11:00")
            .status(no_show)
            .amount(80.0)
            .insert(&state.db)
            .await;
        // Out of range
        SeedReservation::new(&bob.id, &court1.id, "2023-12-31 23:00", "2024-01-01 00:30")
            .status(no_show)
            .insert(&state.db)
            .await;
        SeedReservation::new(&bob.id, &court1.id, "2024-02-01 00:00", "2024-02-01 01:00")
            .status(no_show)
            .insert(&state.db)
            .await;
        // In range but not a no-show
        SeedReservation::new(&bob.id, &court1.id, "2024-01-20 10:00", "2024-01-20 11:00")
            .status(ReservationStatus::Completed)
            .insert(&state.db)
            .await;

        let filter = NoShowFilter {
            date_from: Some(day(2024, 1, 1)),
            date_to: Some(day(2024, 1, 31)),
            ..Default::default()
        };
        let report = ReportService::no_show_report(&state, &filter).await.unwrap();

        assert_eq!(report.summary.total_no_shows, 3);
        assert_eq!(report.summary.revenue_lost, 330.0);
        assert_eq!(report.summary.unique_users, 2);
        assert_eq!(report.summary.facilities_affected, 2);
        assert_eq!(report.reservations.len(), 3);
        for r in &report.reservations {
            assert_eq!(r.status, ReservationStatus::NoShow);
            let date = r.start_time.date();
            assert!(date >= day(2024, 1, 1) && date <= day(2024, 1, 31));
        }

        assert_eq!(report.offenders.len(), 2);
        assert_eq!(report.offenders[0].user_id, alice.id);
        assert_eq!(report.offenders[0].no_show_count, 2);
        assert_eq!(report.offenders[0].revenue_lost, 250.0);

        let by_user = NoShowFilter {
            user_query: Some("BOB".to_string()),
            ..filter.clone()
        };
        let report = ReportService::no_show_report(&state, &by_user).await.unwrap();
        assert_eq!(report.summary.total_no_shows, 1);

        let by_facility = NoShowFilter {
            facility_id: Some(court2.id.clone()),
            ..filter
        };
        let report = ReportService::no_show_report(&state, &by_facility)
            .await
            .unwrap();
        assert_eq!(report.summary.total_no_shows, 1);
        assert_eq!(report.summary.revenue_lost, 150.0);
    }

    #[tokio::test]
    async fn empty_no_show_report_has_zero_summary() {
        let state = test_state().await;
        let report = ReportService::no_show_report(&state, &NoShowFilter::default())
            .await
            .unwrap();
        assert_eq!(report.summary.total_no_shows, 0);
        assert_eq!(report.summary.revenue_lost, 0.0);
        assert!(report.offenders.is_empty());
    }

    #[tokio::test]
    async fn usage_history_filters_and_sorts() {
        let state = test_state().await;
        let user = seed_user(&state.db, "carol@example.com", Role::User).await;
        let category = seed_category(&state.db, "Rooms").await;
        let room = seed_facility(&state.db, &category.id, "Room").await;

        let mut log_ids = Vec::new();
        for (start, end, finish) in [
            ("2024-04-01 10:00", "2024-04-01 11:00", "2024-04-01 11:00"),
            ("2024-04-03 10:00", "2024-04-03 11:00", "2024-04-03 11:10"),
            ("2024-04-05 10:00", "2024-04-05 11:00", "2024-04-05 10:45"),
        ] {
            let r = SeedReservation::new(&user.id, &room.id, start, end)
                .status(ReservationStatus::Confirmed)
                .insert(&state.db)
                .await;
            let log = UsageManager::start_usage(&state, &r.id, dt(start)).await.unwrap();
            UsageManager::complete_usage(&state, &log.id, dt(finish))
                .await
                .unwrap();
            log_ids.push(log.id);
        }
        UsageManager::verify_usage(&state, &log_ids[0], &user.id, None)
            .await
            .unwrap();

        let latest = ReportService::usage_history(&state, &UsageFilter::default())
            .await
            .unwrap();
        let ids: Vec<_> = latest.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![log_ids[2].clone(), log_ids[1].clone(), log_ids[0].clone()]);

        let oldest = ReportService::usage_history(
            &state,
            &UsageFilter {
                sort: UsageSort::Oldest,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(oldest[0].id, log_ids[0]);

        let ranged = ReportService::usage_history(
            &state,
            &UsageFilter {
                date_from: Some(day(2024, 4, 2)),
                date_to: Some(day(2024, 4, 3)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].id, log_ids[1]);

        let verified = ReportService::usage_history(
            &state,
            &UsageFilter {
                status: Some(UsageStatus::Verified),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].facility_name, "Room");

        let nobody = ReportService::usage_history(
            &state,
            &UsageFilter {
                user_query: Some("dave".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn dashboard_counts() {
        let state = test_state().await;
        let user = seed_user(&state.db, "erin@example.com", Role::User).await;
        let category = seed_category(&state.db, "Courts").await;
        let court = seed_facility(&state.db, &category.id, "Court").await;
        seed_facility(&state.db, &category.id, "Court 2").await;

        SeedReservation::new(&user.id, &court.id, "2024-05-01 10:00", "2024-05-01 11:00")
            .payment(PaymentStatus::Pending, Some("/uploads/a.png"))
            .insert(&state.db)
            .await;
        SeedReservation::new(&user.id, &court.id, "2024-05-02 10:00", "2024-05-02 11:00")
            .status(ReservationStatus::Confirmed)
            .payment(PaymentStatus::Paid, Some("/uploads/b.png"))
            .amount(120.0)
            .insert(&state.db)
            .await;
        SeedReservation::new(&user.id, &court.id, "2024-06-01 10:00", "2024-06-01 11:00")
            .status(ReservationStatus::Confirmed)
            .insert(&state.db)
            .await;

        let stats = ReportService::dashboard(&state, None, None, day(2024, 5, 1))
            .await
            .unwrap();
        assert_eq!(stats.total_reservations, 3);
        assert_eq!(stats.pending_payment_verifications, 1);
        assert_eq!(stats.paid_revenue, 120.0);
        assert_eq!(stats.active_facilities, 2);
        assert_eq!(stats.closed_facilities, 0);
        assert_eq!(stats.active_events, 0);
        let confirmed = stats
            .reservations_by_status
            .iter()
            .find(|s| s.status == "confirmed")
            .unwrap();
        assert_eq!(confirmed.count, 2);

        let may = ReportService::dashboard(
            &state,
            Some(day(2024, 5, 1)),
            Some(day(2024, 5, 31)),
            day(2024, 5, 1),
        )
        .await
        .unwrap();
        assert_eq!(may.total_reservations, 2);
    }

    #[tokio::test]
    async fn reservation_list_filters() {
        let state = test_state().await;
        let frank = seed_user(&state.db, "frank@example.com", Role::User).await;
        let grace = seed_user(&state.db, "grace@example.com", Role::User).await;
        let category = seed_category(&state.db, "Courts").await;
        let court = seed_facility(&state.db, &category.id, "Court").await;

        SeedReservation::new(&frank.id, &court.id, "2024-05-01 10:00", "2024-05-01 11:00")
            .insert(&state.db)
            .await;
        SeedReservation::new(&grace.id, &court.id, "2024-05-03 10:00", "2024-05-03 11:00")
            .status(ReservationStatus::Confirmed)
            .payment(PaymentStatus::Paid, Some("/uploads/x.png"))
            .insert(&state.db)
            .await;

        let all = ReportService::reservation_list(&state, &ReservationFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_email, "grace@example.com");

        let paid = ReportService::reservation_list(
            &state,
            &ReservationFilter {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(paid.len(), 1);

        let frank_only = ReportService::reservation_list(
            &state,
            &ReservationFilter {
                user_query: Some("FRANK".to_string()),
                date_to: Some(day(2024, 5, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(frank_only.len(), 1);
        assert_eq!(frank_only[0].user_id, frank.id);
    }

    #[tokio::test]
    async fn user_search_treats_wildcards_literally() {
        let state = test_state().await;
        let plain = seed_user(&state.db, "plain@example.com", Role::User).await;
        let under = seed_user(&state.db, "first_last@example.com", Role::User).await;
        let category = seed_category(&state.db, "Courts").await;
        let court = seed_facility(&state.db, &category.id, "Court").await;

        for (user, start, end) in [
            (&plain, "2024-05-01 10:00", "2024-05-01 11:00"),
            (&under, "2024-05-02 10:00", "2024-05-02 11:00"),
        ] {
            SeedReservation::new(&user.id, &court.id, start, end)
                .insert(&state.db)
                .await;
        }

        let search = |q: &str| ReservationFilter {
            user_query: Some(q.to_string()),
            ..Default::default()
        };

        let underscore = ReportService::reservation_list(&state, &search("_"))
            .await
            .unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].user_id, under.id);

        let percent = ReportService::reservation_list(&state, &search("%"))
            .await
            .unwrap();
        assert!(percent.is_empty());
    }
}
