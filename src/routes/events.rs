use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};

use crate::db::{
    FacilityEvent, FacilityEventInput, FacilityEventRepository, FacilityListItem,
    FacilityRepository,
};
use crate::error::AppResult;
use crate::i18n;
use crate::routes::auth::AdminUser;
use crate::routes::page::{self, Flash};
use crate::services::{event_closure::EventClosureService, local_today};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(show).post(act))
}

#[derive(Debug, Deserialize)]
pub struct EventForm {
    #[serde(default)]
    pub action: String,
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, alias = "facility_ids[]")]
    pub facility_ids: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsPage {
    pub events: Vec<FacilityEvent>,
    pub facilities: Vec<FacilityListItem>,
}

async fn render(
    state: &Arc<AppState>,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let events = FacilityEventRepository::list_all(&state.db).await?;
    let facilities = FacilityRepository::list(&state.db, None).await?;
    Ok(page::render(status, flash, EventsPage { events, facilities }))
}

async fn show(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Response> {
    render(&state, StatusCode::OK, None).await
}

async fn act(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    Form(form): Form<EventForm>,
) -> AppResult<Response> {
    let result = run_action(&state, ctx.user_id(), &form).await;
    let (status, flash) = page::action_flash(&form.action, result);
    render(&state, status, Some(flash)).await
}

/// Field presence and parsing only; business rules live in the closure service.
fn input(form: &EventForm) -> AppResult<FacilityEventInput> {
    Ok(FacilityEventInput {
        title: form.title.clone().unwrap_or_default(),
        description: form.description.clone(),
        facility_ids: form.facility_ids.clone(),
        start_date: page::parse_date(&form.start_date, "Start date")?,
        end_date: page::parse_date(&form.end_date, "End date")?,
        start_time: page::parse_optional_time(&form.start_time, "Start time")?,
        end_time: page::parse_optional_time(&form.end_time, "End time")?,
    })
}

async fn run_action(state: &Arc<AppState>, actor_id: &str, form: &EventForm) -> AppResult<String> {
    let today = local_today();

    match form.action.as_str() {
        "add_event" => {
            let (event, summary) =
                EventClosureService::add_event(state, input(form)?, actor_id, today).await?;
            Ok(i18n::t_with(
                "event.added",
                &[
                    ("title", event.title.as_str()),
                    ("count", &summary.closed.to_string()),
                ],
            ))
        }
        "update_event" => {
            let id = page::required(&form.id, "Event")?;
            let event = EventClosureService::update_event(state, id, input(form)?, today).await?;
            Ok(i18n::t_with("event.updated", &[("title", event.title.as_str())]))
        }
        "delete_event" => {
            let id = page::required(&form.id, "Event")?;
            EventClosureService::delete_event(state, id, today).await?;
            Ok(i18n::t("event.deleted"))
        }
        "toggle_event_status" => {
            let id = page::required(&form.id, "Event")?;
            let event = EventClosureService::toggle_event_status(state, id, today).await?;
            let key = if event.is_active {
                "event.activated"
            } else {
                "event.deactivated"
            };
            Ok(i18n::t_with(key, &[("title", event.title.as_str())]))
        }
        other => Err(page::unknown_action(other)),
    }
}
