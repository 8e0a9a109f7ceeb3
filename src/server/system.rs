use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use super::error::ApiError;
use super::AppState;
use crate::preferences::{Preferences, PreferencesPatch};

pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "mock": state.source.is_fixture(),
        "reminders": state.hub.reminders_running(),
    }))
}

/// Probe the database stub. Failures keep the `{ success, error }` shape
/// rather than the plain `{ error }` used elsewhere.
pub async fn database_init(State(state): State<AppState>) -> Response {
    match state.database.init() {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            warn!(error = %e, "database init failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
    Json(state.preferences.lock().await.get())
}

pub async fn put_preferences(
    State(state): State<AppState>,
    body: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Preferences>, ApiError> {
    let Json(patch) = body?;
    let updated = state.preferences.lock().await.update(patch)?;
    Ok(Json(updated))
}
