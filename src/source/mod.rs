//! Where Classroom and Calendar data comes from.
//!
//! Handlers and the aggregator only ever see [`ClassroomDataSource`]. The
//! concrete source is picked once at startup: [`LiveSource`] talks to Google,
//! [`FixtureSource`] serves deterministic demo data with identical shapes.

mod fixture;
mod live;

pub use fixture::FixtureSource;
pub use live::LiveSource;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::api::ClassroomError;
use crate::models::*;
use crate::session::Session;

#[async_trait]
pub trait ClassroomDataSource: Send + Sync {
    /// True when serving fixtures instead of live data.
    fn is_fixture(&self) -> bool;

    async fn profile(&self, session: &Session) -> Result<Profile, ClassroomError>;

    /// Visible courses the caller teaches or attends, de-duplicated.
    async fn courses(&self, session: &Session) -> Result<Vec<Course>, ClassroomError>;

    async fn students(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError>;

    async fn teachers(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError>;

    async fn coursework(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Vec<Coursework>, ClassroomError>;

    async fn submissions(
        &self,
        session: &Session,
        course_id: &str,
        coursework_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<Submission>, ClassroomError>;

    async fn calendar_events(
        &self,
        session: &Session,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, ClassroomError>;
}

/// Concatenate the teacher-of and student-of listings, keep the first record
/// seen for each id, then drop courses that are not visible.
pub fn merge_courses(teaching: Vec<Course>, enrolled: Vec<Course>) -> Vec<Course> {
    let mut seen = HashSet::new();
    teaching
        .into_iter()
        .chain(enrolled)
        .filter(|c| seen.insert(c.id.clone()))
        .filter(Course::is_visible)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, name: &str, state: Option<&str>) -> Course {
        Course {
            id: id.into(),
            name: name.into(),
            section: None,
            enrollment_code: None,
            course_state: state.map(str::to_string),
            owner_id: None,
            alternate_link: None,
        }
    }

    #[test]
    fn overlapping_ids_keep_first_record() {
        let teaching = vec![course("1", "Teaching copy", Some("ACTIVE"))];
        let enrolled = vec![
            course("1", "Student copy", Some("ACTIVE")),
            course("2", "Other", None),
        ];
        let merged = merge_courses(teaching, enrolled);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Teaching copy");
        assert_eq!(merged[1].id, "2");
    }

    #[test]
    fn hidden_states_are_dropped() {
        let merged = merge_courses(
            vec![
                course("1", "a", None),
                course("2", "b", Some("ACTIVE")),
                course("3", "c", Some("PROVISIONED")),
                course("4", "d", Some("ARCHIVED")),
            ],
            vec![course("5", "e", Some("DECLINED"))],
        );
        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
