use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::models::EventQuery;
use crate::session::Session;

const DEFAULT_CALENDAR: &str = "primary";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsParams {
    time_min: Option<String>,
    time_max: Option<String>,
    calendar_id: Option<String>,
}

impl From<EventsParams> for EventQuery {
    fn from(p: EventsParams) -> Self {
        Self {
            calendar_id: p
                .calendar_id
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CALENDAR.to_string()),
            time_min: p.time_min,
            time_max: p.time_max,
        }
    }
}

pub async fn events(
    State(state): State<AppState>,
    session: Session,
    params: Result<Query<EventsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let query = EventQuery::from(params);
    let events = state.source.calendar_events(&session, &query).await?;
    Ok(Json(json!({ "events": events })))
}
