//! HTTP surface consumed by the dashboard. Every route answers JSON; failures
//! are `{ "error": message }` with a 4xx/5xx status.

mod calendar;
mod classroom;
pub mod error;
mod notifications;
mod system;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::database::Database;
use crate::local_store::LocalStore;
use crate::notifications::delivery::Dispatcher;
use crate::notifications::NotificationHub;
use crate::preferences::PreferencesStore;
use crate::source::ClassroomDataSource;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ClassroomDataSource>,
    pub hub: Arc<NotificationHub>,
    pub dispatcher: Dispatcher,
    pub database: Database,
    pub preferences: Arc<Mutex<PreferencesStore>>,
}

impl AppState {
    pub fn new(
        source: Arc<dyn ClassroomDataSource>,
        local: LocalStore,
        dispatcher: Dispatcher,
        database: Database,
    ) -> Self {
        Self {
            source,
            hub: NotificationHub::new(local.clone()),
            dispatcher,
            database,
            preferences: Arc::new(Mutex::new(PreferencesStore::open(local))),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(system::healthz))
        // Classroom
        .route("/api/classroom/courses", get(classroom::courses))
        .route(
            "/api/classroom/courses/:course_id/students",
            get(classroom::students),
        )
        .route(
            "/api/classroom/courses/:course_id/teachers",
            get(classroom::teachers),
        )
        .route(
            "/api/classroom/courses/:course_id/coursework",
            get(classroom::coursework),
        )
        .route(
            "/api/classroom/courses/:course_id/submissions",
            get(classroom::submissions),
        )
        .route(
            "/api/classroom/courses/:course_id/progress",
            get(classroom::progress),
        )
        .route(
            "/api/classroom/courses/:course_id/submission-rows",
            get(classroom::submission_rows_page),
        )
        .route("/api/classroom/users/me", get(classroom::me))
        // Calendar
        .route("/api/calendar/events", get(calendar::events))
        // Notifications
        .route(
            "/api/notifications",
            get(notifications::list).delete(notifications::clear),
        )
        .route("/api/notifications/send", post(notifications::send))
        .route("/api/notifications/refresh", post(notifications::refresh))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route(
            "/api/notifications/settings",
            get(notifications::get_settings).put(notifications::put_settings),
        )
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route(
            "/api/notifications/:id",
            axum::routing::delete(notifications::remove),
        )
        // System
        .route(
            "/api/database/init",
            get(system::database_init).post(system::database_init),
        )
        .route(
            "/api/preferences",
            get(system::get_preferences).put(system::put_preferences),
        )
        .with_state(state)
}
