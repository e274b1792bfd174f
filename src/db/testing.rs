//! In-memory database fixtures shared by the unit tests.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::*;
use super::repository::*;
use crate::config::Config;
use crate::AppState;

/// Fresh in-memory database with migrations applied.
///
/// A single connection that never idles out, since every new connection to
/// `sqlite::memory:` would see an empty database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    pool
}

/// Application state over a fresh in-memory database.
pub async fn test_state() -> Arc<AppState> {
    let mut config = Config::default();
    config.jwt.secret = "test-secret".to_string();

    Arc::new(AppState {
        db: test_pool().await,
        config,
    })
}

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("valid datetime literal")
}

pub async fn seed_user(pool: &SqlitePool, email: &str, role: Role) -> User {
    UserRepository::create(pool, email, email, "not-a-real-hash", role)
        .await
        .expect("seed user")
}

pub async fn seed_category(pool: &SqlitePool, name: &str) -> Category {
    CategoryRepository::create(
        pool,
        &CategoryInput {
            name: name.to_string(),
            description: None,
        },
    )
    .await
    .expect("seed category")
}

pub async fn seed_facility(pool: &SqlitePool, category_id: &str, name: &str) -> Facility {
    FacilityRepository::create(
        pool,
        &FacilityInput {
            category_id: category_id.to_string(),
            name: name.to_string(),
            description: None,
            hourly_rate: 100.0,
            daily_rate: 800.0,
        },
    )
    .await
    .expect("seed facility")
}

/// Reservation row in an arbitrary state, bypassing the lifecycle rules.
#[derive(Debug, Clone)]
pub struct SeedReservation<'a> {
    pub user_id: &'a str,
    pub facility_id: &'a str,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub slip_url: Option<&'a str>,
    pub total_amount: f64,
    pub pricing_option_id: Option<&'a str>,
}

impl<'a> SeedReservation<'a> {
    pub fn new(user_id: &'a str, facility_id: &'a str, start: &str, end: &str) -> Self {
        SeedReservation {
            user_id,
            facility_id,
            start: dt(start),
            end: dt(end),
            status: ReservationStatus::Pending,
            payment_status: PaymentStatus::Pending,
            slip_url: None,
            total_amount: 100.0,
            pricing_option_id: None,
        }
    }

    pub fn status(mut self, status: ReservationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn payment(mut self, payment_status: PaymentStatus, slip_url: Option<&'a str>) -> Self {
        self.payment_status = payment_status;
        self.slip_url = slip_url;
        self
    }

    pub fn amount(mut self, total_amount: f64) -> Self {
        self.total_amount = total_amount;
        self
    }

    pub fn pricing_option(mut self, id: &'a str) -> Self {
        self.pricing_option_id = Some(id);
        self
    }

    pub async fn insert(self, pool: &SqlitePool) -> Reservation {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, user_id, facility_id, pricing_option_id, start_time, end_time,
                status, payment_status, payment_slip_url, total_amount, booking_type,
                attendees, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'hourly', 1, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(self.user_id)
        .bind(self.facility_id)
        .bind(self.pricing_option_id)
        .bind(self.start)
        .bind(self.end)
        .bind(self.status)
        .bind(self.payment_status)
        .bind(self.slip_url)
        .bind(self.total_amount)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("seed reservation");

        ReservationRepository::find_by_id(pool, &id)
            .await
            .expect("load seeded reservation")
            .expect("seeded reservation exists")
    }
}
