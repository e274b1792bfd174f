#![allow(unused_imports)]

//! Database models, one file per table.
//! Everything is re-exported so callers can `use crate::db::models::*;`.

pub mod category;
pub mod facility;
pub mod facility_event;
pub mod pricing_option;
pub mod report;
pub mod reservation;
pub mod status;
pub mod usage_log;
pub mod user;

pub use self::category::*;
pub use self::facility::*;
pub use self::facility_event::*;
pub use self::pricing_option::*;
pub use self::report::*;
pub use self::reservation::*;
pub use self::status::*;
pub use self::usage_log::*;
pub use self::user::*;
