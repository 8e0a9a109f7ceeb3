use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::error::ApiError;
use super::AppState;
use crate::aggregate::{course_progress, fetch_course_snapshot, submission_rows, CourseProgress};
use crate::listing::{filter_submissions_by_status, paginate, parse_status_list, DEFAULT_PAGE_SIZE};
use crate::session::Session;

const COURSES_CACHE: &str = "private, max-age=60";
const COURSEWORK_CACHE: &str = "private, max-age=30";

pub async fn courses(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let (profile, courses) = tokio::join!(
        state.source.profile(&session),
        state.source.courses(&session),
    );
    let courses = courses?;
    // The email is decoration; a token without the profile scope still lists courses.
    let email = match profile {
        Ok(profile) => profile.email,
        Err(e) => {
            warn!(error = %e, "profile fetch failed; omitting email");
            None
        }
    };
    Ok((
        [(CACHE_CONTROL, COURSES_CACHE)],
        Json(json!({ "email": email, "courses": courses })),
    ))
}

pub async fn students(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let students = state.source.students(&session, &course_id).await?;
    Ok(Json(json!({ "courseId": course_id, "students": students })))
}

pub async fn teachers(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let teachers = state.source.teachers(&session, &course_id).await?;
    Ok(Json(json!({ "courseId": course_id, "teachers": teachers })))
}

pub async fn coursework(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let coursework = state.source.coursework(&session, &course_id).await?;
    Ok((
        [(CACHE_CONTROL, COURSEWORK_CACHE)],
        Json(json!({ "courseId": course_id, "coursework": coursework })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionsParams {
    coursework_id: Option<String>,
    user_id: Option<String>,
}

fn required_coursework(id: Option<String>) -> Result<String, ApiError> {
    id.filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing courseworkId".into()))
}

pub async fn submissions(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<String>,
    params: Result<Query<SubmissionsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let coursework_id = required_coursework(params.coursework_id)?;
    let submissions = state
        .source
        .submissions(&session, &course_id, &coursework_id, params.user_id.as_deref())
        .await?;
    Ok(Json(json!({
        "courseId": course_id,
        "courseworkId": coursework_id,
        "submissions": submissions,
    })))
}

pub async fn me(State(state): State<AppState>, session: Session) -> Result<Json<Value>, ApiError> {
    let profile = state.source.profile(&session).await?;
    Ok(Json(json!({ "email": profile.email, "profile": profile })))
}

pub async fn progress(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<String>,
) -> Result<Json<CourseProgress>, ApiError> {
    let snapshot = fetch_course_snapshot(Arc::clone(&state.source), &session, &course_id).await?;
    Ok(Json(course_progress(&snapshot)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsParams {
    coursework_id: Option<String>,
    status: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
}

/// Roster joined against one coursework item's submissions, filtered by
/// canonical status and paged.
pub async fn submission_rows_page(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<String>,
    params: Result<Query<RowsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let coursework_id = required_coursework(params.coursework_id)?;
    let selected = parse_status_list(params.status.as_deref().unwrap_or(""))?;

    let (students, coursework, submissions) = tokio::try_join!(
        state.source.students(&session, &course_id),
        state.source.coursework(&session, &course_id),
        state.source.submissions(&session, &course_id, &coursework_id, None),
    )?;
    let item = coursework
        .iter()
        .find(|c| c.id == coursework_id)
        .ok_or_else(|| ApiError::NotFound(format!("Coursework not found: {coursework_id}")))?;

    let language = state.preferences.lock().await.get().language;
    let rows = submission_rows(&students, item, &submissions, language);
    let filtered = filter_submissions_by_status(&rows, &selected);
    let slice = paginate(
        &filtered,
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );

    Ok(Json(json!({
        "courseId": course_id,
        "courseworkId": coursework_id,
        "rows": slice.items,
        "page": slice.safe_page,
        "totalPages": slice.total_pages,
        "total": filtered.len(),
    })))
}
