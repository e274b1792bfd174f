pub mod auth;
pub mod catalog;
pub mod event_closure;
pub mod init;
pub mod payments;
pub mod reports;
pub mod reservations;
pub mod usage;

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Wall-clock time at the facility. Reservation windows and event dates are
/// stored in local time, audit stamps in UTC.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
