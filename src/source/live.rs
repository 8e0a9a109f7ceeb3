use anyhow::Result;
use async_trait::async_trait;

use super::{merge_courses, ClassroomDataSource};
use crate::api::{CalendarClient, ClassroomClient, ClassroomError};
use crate::models::*;
use crate::session::Session;

/// Google Classroom and Calendar, called with the session's access token.
#[derive(Debug, Clone)]
pub struct LiveSource {
    classroom: ClassroomClient,
    calendar: CalendarClient,
}

impl LiveSource {
    pub fn new(classroom_url: &str, calendar_url: &str) -> Result<Self> {
        Ok(Self {
            classroom: ClassroomClient::new(classroom_url)?,
            calendar: CalendarClient::new(calendar_url)?,
        })
    }
}

#[async_trait]
impl ClassroomDataSource for LiveSource {
    fn is_fixture(&self) -> bool {
        false
    }

    async fn profile(&self, session: &Session) -> Result<Profile, ClassroomError> {
        self.classroom.get_profile(session.access_token()?).await
    }

    async fn courses(&self, session: &Session) -> Result<Vec<Course>, ClassroomError> {
        let token = session.access_token()?;
        let (teaching, enrolled) = tokio::try_join!(
            self.classroom.list_courses_as("teacherId", token),
            self.classroom.list_courses_as("studentId", token),
        )?;
        Ok(merge_courses(teaching, enrolled))
    }

    async fn students(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        self.classroom
            .list_students(course_id, session.access_token()?)
            .await
    }

    async fn teachers(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        self.classroom
            .list_teachers(course_id, session.access_token()?)
            .await
    }

    async fn coursework(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Vec<Coursework>, ClassroomError> {
        self.classroom
            .list_coursework(course_id, session.access_token()?)
            .await
    }

    async fn submissions(
        &self,
        session: &Session,
        course_id: &str,
        coursework_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<Submission>, ClassroomError> {
        self.classroom
            .list_submissions(course_id, coursework_id, user_id, session.access_token()?)
            .await
    }

    async fn calendar_events(
        &self,
        session: &Session,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, ClassroomError> {
        self.calendar
            .list_events(query, session.access_token()?)
            .await
    }
}
