/*
Message catalog for flash messages and API errors.

This module provides:
- An embedded message store (compile-time embedded JSON).
- `t` / `t_with` to look up a message by key, with optional params.

Usage:
    use crate::i18n;
    let msg = i18n::t("failure.add_category");
    let msg_with = i18n::t_with("category.added", &[("name", "Courts")]);

Notes:
- Placeholders use single-brace format: `{name}`.
- A missing key yields the key itself.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

static MESSAGES: OnceLock<HashMap<String, String>> = OnceLock::new();

const EN_JSON: &str = r#"
{
  "category.added": "Category \"{name}\" added successfully",
  "category.updated": "Category \"{name}\" updated successfully",
  "category.deleted": "Category deleted successfully",
  "facility.added": "Facility \"{name}\" added successfully",
  "facility.updated": "Facility \"{name}\" updated successfully",
  "facility.activated": "Facility \"{name}\" activated",
  "facility.deactivated": "Facility \"{name}\" deactivated",
  "pricing.added": "Pricing option \"{name}\" added successfully",
  "pricing.updated": "Pricing option \"{name}\" updated successfully",
  "pricing.deleted": "Pricing option deleted successfully",
  "event.added": "Event \"{title}\" created; {count} facilities closed",
  "event.updated": "Event \"{title}\" updated successfully",
  "event.deleted": "Event deleted successfully",
  "event.activated": "Event \"{title}\" activated",
  "event.deactivated": "Event \"{title}\" deactivated",
  "reservation.created": "Reservation created",
  "reservation.status_updated": "Reservation status updated to {status}",
  "reservation.marked_no_show": "Reservation marked as no-show",
  "payment.approved": "Payment approved",
  "payment.rejected": "Payment rejected",
  "payment.approved_confirmed": "Payment approved and reservation confirmed",
  "payment.slip_submitted": "Payment slip submitted for verification",
  "usage.started": "Usage started",
  "usage.completed": "Usage completed ({minutes} minutes)",
  "usage.verified": "Usage verified",
  "auth.logged_out": "Logged out",

  "failure.add_category": "Failed to add category. Please try again.",
  "failure.update_category": "Failed to update category. Please try again.",
  "failure.delete_category": "Failed to delete category. Please try again.",
  "failure.add_facility": "Failed to add facility. Please try again.",
  "failure.update_facility": "Failed to update facility. Please try again.",
  "failure.toggle_facility": "Failed to update facility status. Please try again.",
  "failure.add_pricing_option": "Failed to add pricing option. Please try again.",
  "failure.update_pricing_option": "Failed to update pricing option. Please try again.",
  "failure.delete_pricing_option": "Failed to delete pricing option. Please try again.",
  "failure.add_event": "Failed to create event. Please try again.",
  "failure.update_event": "Failed to update event. Please try again.",
  "failure.delete_event": "Failed to delete event. Please try again.",
  "failure.toggle_event_status": "Failed to update event status. Please try again.",
  "failure.update_status": "Failed to update reservation status. Please try again.",
  "failure.verify_payment": "Failed to verify payment. Please try again.",
  "failure.start_usage": "Failed to start usage. Please try again.",
  "failure.complete_usage": "Failed to complete usage. Please try again.",
  "failure.verify_usage": "Failed to verify usage. Please try again.",
  "failure.generic": "Something went wrong. Please try again.",

  "validation.required": "{field} is required",
  "validation.too_long": "{field} must be at most {max} characters",
  "validation.negative": "{field} must not be negative",
  "validation.invalid_number": "{field} must be a number",
  "validation.invalid_date": "{field} must be a date (YYYY-MM-DD)",
  "validation.invalid_time": "{field} must be a time (HH:MM)",
  "validation.invalid_datetime": "{field} must be a date and time (YYYY-MM-DDTHH:MM)",
  "validation.date_range": "End date must be on or after the start date",
  "validation.time_range": "End time must be after the start time",
  "validation.time_pair": "Give both a start and an end time, or neither",
  "validation.booking_range": "Reservation must end after it starts",
  "validation.booking_in_past": "Reservation cannot start in the past",
  "validation.slip_url": "Payment slip must be an http(s) URL or an /uploads/ path",
  "validation.attendees": "At least one attendee is required",
  "validation.facilities_required": "Select at least one facility",
  "validation.unknown_facilities": "One or more selected facilities do not exist",
  "validation.unknown_action": "Unknown action: {action}",
  "validation.invalid_value": "Invalid value for {field}: {value}",

  "conflict.category_exists": "A category named \"{name}\" already exists",
  "conflict.category_in_use": "Cannot delete category: {count} facilities still belong to it",
  "conflict.pricing_in_use": "Cannot delete pricing option: it is used by {count} reservations",
  "conflict.facility_active_reservations": "Cannot deactivate facility: it has {count} active reservations",
  "conflict.illegal_transition": "Cannot change reservation status from {from} to {to}",
  "conflict.status_changed": "Reservation was modified by someone else; reload and try again",
  "conflict.payment_not_pending": "Payment is not awaiting verification",
  "conflict.payment_no_slip": "No payment slip has been uploaded",
  "conflict.payment_already_paid": "Payment has already been verified",
  "conflict.usage_requires_confirmed": "Usage can only start for confirmed reservations",
  "conflict.usage_already_active": "Usage is already in progress for this reservation",
  "conflict.usage_not_active": "Usage is not in progress",
  "conflict.usage_not_completed": "Only completed usage can be verified",
  "conflict.facility_unavailable": "Facility is not available for booking",
  "conflict.facility_closed": "Facility is closed: {reason}",
  "conflict.slot_taken": "The facility is already booked for that time",
  "conflict.pricing_option_mismatch": "Pricing option does not belong to this facility",
  "conflict.reservation_closed": "Reservation is {status}; payment can no longer be submitted",

  "not_found.category": "Category not found",
  "not_found.facility": "Facility not found",
  "not_found.pricing_option": "Pricing option not found",
  "not_found.event": "Event not found",
  "not_found.reservation": "Reservation not found",
  "not_found.usage_log": "Usage log not found",
  "not_found.user": "User not found",

  "auth.invalid_credentials": "Invalid email or password",

  "api.facility_id_required": "facility_id is required",
  "api.facility_id_invalid": "facility_id is invalid",
  "api.method_not_allowed": "Method not allowed",
  "api.database_error": "Database error",

  "app.name": "Facility Admin"
}
"#;

fn messages() -> &'static HashMap<String, String> {
    MESSAGES.get_or_init(|| {
        serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
            panic!("failed to parse EN_JSON in i18n module: {}", e);
        })
    })
}

/// Look up `key`, substituting `{name}` placeholders from `params`.
/// Returns the key itself when no message exists (useful in logs).
fn lookup(key: &str, params: &[(&str, &str)]) -> String {
    let mut s = messages()
        .get(key)
        .cloned()
        .unwrap_or_else(|| key.to_string());
    for (k, v) in params {
        s = s.replace(&format!("{{{}}}", k), v);
    }
    s
}

pub fn t(key: &str) -> String {
    lookup(key, &[])
}

pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    lookup(key, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_basic() {
        let s = t("failure.add_category");
        assert_eq!(s, "Failed to add category. Please try again.");
    }

    #[test]
    fn test_t_with_params() {
        let s = t_with(
            "conflict.illegal_transition",
            &[("from", "completed"), ("to", "no_show")],
        );
        assert_eq!(
            s,
            "Cannot change reservation status from completed to no_show"
        );
    }

    #[test]
    fn unknown_params_are_left_alone() {
        let s = t_with("not_found.facility", &[("name", "Court 1")]);
        assert_eq!(s, "Facility not found");
    }

    #[test]
    fn missing_key_returns_key() {
        let k = "non.existent.key";
        assert_eq!(t(k), k.to_string());
    }

    #[test]
    fn every_page_action_has_failure_message() {
        for action in [
            "add_category",
            "update_category",
            "delete_category",
            "add_facility",
            "update_facility",
            "toggle_facility",
            "add_pricing_option",
            "update_pricing_option",
            "delete_pricing_option",
            "add_event",
            "update_event",
            "delete_event",
            "toggle_event_status",
            "update_status",
            "verify_payment",
            "start_usage",
            "complete_usage",
            "verify_usage",
        ] {
            let key = format!("failure.{}", action);
            assert_ne!(t(&key), key, "missing failure message for {}", action);
        }
    }
}
