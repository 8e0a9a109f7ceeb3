use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::error::ApiError;
use super::AppState;
use crate::api::ClassroomError;
use crate::models::{Coursework, Submission};
use crate::notifications::delivery::{Channel, DeliveryPayload, DeliveryReport};
use crate::notifications::rules::{self, CourseActivity};
use crate::notifications::{NotificationSettings, NotificationStore};
use crate::session::Session;
use crate::source::ClassroomDataSource;

// ─── Delivery ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    payload: DeliveryPayload,
    #[serde(default)]
    channels: Option<Vec<String>>,
}

pub async fn send(
    State(state): State<AppState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<DeliveryReport>, ApiError> {
    let Json(request) = body?;
    let channels = match request.channels {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|n| n.parse::<Channel>())
            .collect::<Result<Vec<_>, _>>()?,
        _ => vec![Channel::Email],
    };
    let report = state.dispatcher.send(&request.payload, &channels).await?;
    Ok(Json(report))
}

// ─── In-app list ─────────────────────────────────────────────────────────────

/// Notifications are filed under the caller's email, falling back to the
/// profile id for accounts without one.
async fn user_key(state: &AppState, session: &Session) -> Result<String, ApiError> {
    let profile = state.source.profile(session).await?;
    Ok(profile.email.unwrap_or(profile.id))
}

fn list_view(store: &NotificationStore) -> Value {
    json!({
        "email": store.email(),
        "unreadCount": store.unread_count(),
        "notifications": store.list(),
    })
}

pub async fn list(State(state): State<AppState>, session: Session) -> Result<Json<Value>, ApiError> {
    let email = user_key(&state, &session).await?;
    Ok(Json(state.hub.with_store(&email, |s| list_view(s)).await))
}

/// Coursework plus the caller's own submission per item for one course.
/// Submission calls run concurrently; a failing one only skips its item.
async fn own_course_activity(
    source: Arc<dyn ClassroomDataSource>,
    session: Session,
    course_id: String,
) -> Result<(Vec<Coursework>, HashMap<String, Submission>), ClassroomError> {
    let coursework = source.coursework(&session, &course_id).await?;

    let mut tasks = JoinSet::new();
    for item in &coursework {
        let source = Arc::clone(&source);
        let session = session.clone();
        let course_id = course_id.clone();
        let coursework_id = item.id.clone();
        tasks.spawn(async move {
            let result = source
                .submissions(&session, &course_id, &coursework_id, Some("me"))
                .await;
            (coursework_id, result)
        });
    }

    let mut submissions = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((coursework_id, Ok(subs))) => {
                if let Some(sub) = subs.into_iter().next() {
                    submissions.insert(coursework_id, sub);
                }
            }
            Ok((coursework_id, Err(e))) => warn!(
                course_id = %course_id,
                coursework_id = %coursework_id,
                error = %e,
                "submission fetch failed; skipping item"
            ),
            Err(e) => warn!(course_id = %course_id, error = %e, "submission task aborted"),
        }
    }
    Ok((coursework, submissions))
}

/// Run the deadline, overdue and grade rules over every visible course for
/// the caller's own submissions.
pub async fn refresh(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    let email = user_key(&state, &session).await?;
    let courses = state.source.courses(&session).await?;
    let settings = state.hub.with_store(&email, |s| *s.settings()).await;
    let now = Utc::now();

    let mut tasks = JoinSet::new();
    for (index, course) in courses.iter().enumerate() {
        let fetch = own_course_activity(
            Arc::clone(&state.source),
            session.clone(),
            course.id.clone(),
        );
        tasks.spawn(async move { (index, fetch.await) });
    }

    let mut fetched = Vec::with_capacity(courses.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(activity))) => fetched.push((index, activity)),
            Ok((index, Err(e))) => warn!(
                course_id = %courses[index].id,
                error = %e,
                "coursework fetch failed; skipping course"
            ),
            Err(e) => warn!(error = %e, "course task aborted"),
        }
    }
    // Course order keeps the generated list stable across refreshes.
    fetched.sort_by_key(|(index, _)| *index);

    let mut generated = Vec::new();
    for (index, (coursework, submissions)) in &fetched {
        let activity = CourseActivity {
            course: &courses[*index],
            coursework,
            submissions,
        };
        generated.extend(rules::evaluate(&activity, &email, &settings, now));
    }

    let (added, mut view) = state
        .hub
        .with_store(&email, |s| s.push_all(generated).map(|added| (added, list_view(s))))
        .await?;
    info!(email = %email, added, "notifications refreshed");
    view["added"] = json!(added);
    Ok(Json(view))
}

pub async fn mark_read(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let email = user_key(&state, &session).await?;
    let (found, view) = state
        .hub
        .with_store(&email, |s| s.mark_read(&id).map(|found| (found, list_view(s))))
        .await?;
    if !found {
        return Err(ApiError::NotFound(format!("Notification not found: {id}")));
    }
    Ok(Json(view))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    let email = user_key(&state, &session).await?;
    let (updated, mut view) = state
        .hub
        .with_store(&email, |s| s.mark_all_read().map(|n| (n, list_view(s))))
        .await?;
    view["updated"] = json!(updated);
    Ok(Json(view))
}

pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let email = user_key(&state, &session).await?;
    let (removed, view) = state
        .hub
        .with_store(&email, |s| s.remove(&id).map(|removed| (removed, list_view(s))))
        .await?;
    if !removed {
        return Err(ApiError::NotFound(format!("Notification not found: {id}")));
    }
    Ok(Json(view))
}

pub async fn clear(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    let email = user_key(&state, &session).await?;
    let view = state
        .hub
        .with_store(&email, |s| s.clear().map(|()| list_view(s)))
        .await?;
    Ok(Json(view))
}

// ─── Settings ────────────────────────────────────────────────────────────────

pub async fn get_settings(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<NotificationSettings>, ApiError> {
    let email = user_key(&state, &session).await?;
    Ok(Json(state.hub.with_store(&email, |s| *s.settings()).await))
}

pub async fn put_settings(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<NotificationSettings>, JsonRejection>,
) -> Result<Json<NotificationSettings>, ApiError> {
    let Json(settings) = body?;
    let email = user_key(&state, &session).await?;
    state
        .hub
        .with_store(&email, |s| s.update_settings(settings))
        .await?;
    Ok(Json(settings))
}
