//! Startup helpers:
//! - database connection + migrations
//! - the maintenance worker that expires stale bookings and reopens
//!   facilities whose event closure has lapsed

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};

use crate::config::Config;
use crate::db::ReservationRepository;
use crate::error::AppResult;
use crate::services::event_closure::EventClosureService;
use crate::AppState;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Open the SQLite pool and run migrations.
///
/// The parent directory of the database file is created when missing.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Connected to database file: {}", db_file_path.display());

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_reservations: u64,
    pub reopened_facilities: usize,
}

/// One maintenance pass: pending reservations whose window has ended become
/// `expired`, and facilities whose closure end date has passed are reconciled.
pub async fn run_maintenance(
    state: &Arc<AppState>,
    now: NaiveDateTime,
    today: NaiveDate,
) -> AppResult<MaintenanceReport> {
    let expired_reservations = ReservationRepository::expire_stale(&state.db, now).await?;
    let summary = EventClosureService::reconcile_lapsed(state, today).await?;

    Ok(MaintenanceReport {
        expired_reservations,
        reopened_facilities: summary.reopened,
    })
}

/// Spawn background workers. Each listens for a shutdown notification on
/// `shutdown` and the returned handles can be awaited on exit.
pub fn spawn_background_workers(
    state: Arc<AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    if !state.config.maintenance.enabled {
        tracing::info!("Maintenance worker disabled");
        return handles;
    }

    let mut shutdown_rx = shutdown.subscribe();
    let interval = Duration::from_secs(state.config.maintenance.interval_seconds.max(1));
    handles.push(tokio::spawn(async move {
        loop {
            tracing::debug!("Running reservation maintenance");

            match run_maintenance(
                &state,
                crate::services::local_now(),
                crate::services::local_today(),
            )
            .await
            {
                Ok(report) => {
                    if report != MaintenanceReport::default() {
                        tracing::info!(
                            "Maintenance expired {} reservations, reopened {} facilities",
                            report.expired_reservations,
                            report.reopened_facilities
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Maintenance pass failed: {:?}", e);
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Maintenance worker shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }));

    handles
}
