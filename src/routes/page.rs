//! Shared plumbing for the admin pages.
//!
//! Every page answers GET with a [`Page`] payload and POST with the same
//! payload after running the submitted `action`, carrying a flash message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::i18n;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub flash: Option<Flash>,
    #[serde(flatten)]
    pub data: T,
}

pub fn render<T: Serialize>(status: StatusCode, flash: Option<Flash>, data: T) -> Response {
    (status, Json(Page { flash, data })).into_response()
}

/// Turn the result of a page action into the flash shown on the re-rendered page.
///
/// Failures without a public message are logged and replaced by the
/// `failure.<action>` text.
pub fn action_flash(action: &str, result: AppResult<String>) -> (StatusCode, Flash) {
    match result {
        Ok(message) => (StatusCode::OK, Flash::success(message)),
        Err(err) => {
            let status = err.status_code();
            let message = match err.public_message() {
                Some(message) => {
                    tracing::debug!("Action {} rejected: {}", action, message);
                    message
                }
                None => {
                    err.log();
                    let key = format!("failure.{}", action);
                    let text = i18n::t(&key);
                    if text == key {
                        i18n::t("failure.generic")
                    } else {
                        text
                    }
                }
            };
            (status, Flash::error(message))
        }
    }
}

pub fn unknown_action(action: &str) -> AppError {
    AppError::Validation(i18n::t_with(
        "validation.unknown_action",
        &[("action", action)],
    ))
}

// ============================================================================
// Form fields
// ============================================================================

/// Trimmed value, `None` when absent or blank.
pub fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn required<'a>(value: &'a Option<String>, label: &str) -> AppResult<&'a str> {
    field(value).ok_or_else(|| {
        AppError::Validation(i18n::t_with("validation.required", &[("field", label)]))
    })
}

pub fn parse_number(value: &Option<String>, label: &str) -> AppResult<f64> {
    required(value, label)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            AppError::Validation(i18n::t_with("validation.invalid_number", &[("field", label)]))
        })
}

pub fn parse_optional_int(value: &Option<String>, label: &str) -> AppResult<Option<i64>> {
    field(value)
        .map(|v| {
            v.parse::<i64>().map_err(|_| {
                AppError::Validation(i18n::t_with(
                    "validation.invalid_number",
                    &[("field", label)],
                ))
            })
        })
        .transpose()
}

/// HTML checkbox semantics: present and not an explicit "off" value means checked.
pub fn checkbox(value: &Option<String>) -> bool {
    match field(value) {
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"),
        None => false,
    }
}

pub fn parse_date(value: &Option<String>, label: &str) -> AppResult<NaiveDate> {
    let raw = required(value, label)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(i18n::t_with("validation.invalid_date", &[("field", label)]))
    })
}

pub fn parse_optional_time(value: &Option<String>, label: &str) -> AppResult<Option<NaiveTime>> {
    field(value)
        .map(|raw| {
            NaiveTime::parse_from_str(raw, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
                .map_err(|_| {
                    AppError::Validation(i18n::t_with(
                        "validation.invalid_time",
                        &[("field", label)],
                    ))
                })
        })
        .transpose()
}

/// Accepts `datetime-local` input values with or without seconds.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

// ============================================================================
// Query filters
// ============================================================================

// Listing filters are lenient: a malformed value is dropped instead of failing the page.

pub fn filter_text(value: &Option<String>) -> Option<String> {
    field(value).map(str::to_string)
}

pub fn filter_date(value: &Option<String>) -> Option<NaiveDate> {
    field(value).and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
}

pub fn filter_enum<T>(value: &Option<String>, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    field(value).and_then(parse)
}
