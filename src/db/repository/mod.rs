pub mod category;
pub mod facility;
pub mod facility_event;
pub mod pricing_option;
pub mod report;
pub mod reservation;
pub mod usage_log;
pub mod user;

use sqlx::{QueryBuilder, Sqlite};

pub use category::CategoryRepository;
pub use facility::FacilityRepository;
pub use facility_event::FacilityEventRepository;
pub use pricing_option::PricingOptionRepository;
pub use report::{NoShowFilter, ReportRepository, UsageFilter, UsageSort};
pub use reservation::{ReservationFilter, ReservationRepository};
pub use usage_log::UsageLogRepository;
pub use user::UserRepository;

/// `%query%` for a `LIKE ... ESCAPE '\'` match, with the wildcards in `query`
/// taken literally.
pub(crate) fn like_contains(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on the joined user's name or email (`u`).
pub(crate) fn push_user_match(builder: &mut QueryBuilder<'_, Sqlite>, query: &str) {
    let pattern = like_contains(query);
    builder
        .push(" AND (LOWER(u.full_name) LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\' OR LOWER(u.email) LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\')");
}
