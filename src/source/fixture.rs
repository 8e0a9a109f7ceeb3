use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Offset, Timelike, Utc};

use super::{merge_courses, ClassroomDataSource};
use crate::api::ClassroomError;
use crate::models::*;
use crate::session::Session;

const COURSES: [(&str, Option<&str>, Option<&str>); 4] = [
    ("Programación Web", Some("Comisión A"), Some("ACTIVE")),
    ("Diseño UX/UI", Some("Comisión B"), Some("ACTIVE")),
    ("Marketing Digital", None, Some("PROVISIONED")),
    ("Introducción a la Programación 2025", None, Some("ARCHIVED")),
];

const STUDENTS: [(&str, &str); 6] = [
    ("Lucía Fernández", "lucia.fernandez"),
    ("Mateo González", "mateo.gonzalez"),
    ("Valentina Rodríguez", "valentina.rodriguez"),
    ("Santiago López", "santiago.lopez"),
    ("Camila Martínez", "camila.martinez"),
    ("Benjamín Díaz", "benjamin.diaz"),
];

const TEACHERS: [(&str, &str); 2] = [
    ("Laura Sánchez", "laura.sanchez"),
    ("Diego Romero", "diego.romero"),
];

const COURSEWORK: [(&str, i64); 5] = [
    ("Diagnóstico inicial", -14),
    ("Trabajo práctico 1", -5),
    ("Lectura guiada", 1),
    ("Trabajo práctico 2", 3),
    ("Proyecto integrador", 10),
];

const ROTATION: [&str; 5] = ["TURNED_IN", "RETURNED", "CREATED", "RECLAIMED_BY_STUDENT", "NEW"];

const EVENTS: [(&str, i64, bool); 4] = [
    ("Clase sincrónica", 0, true),
    ("Tutoría grupal", 1, true),
    ("Entrega de proyecto", 3, false),
    ("Reunión de coordinación", 7, true),
];

const DOMAIN: &str = "semillero.digital";
const MOCK_EMAIL: &str = "demo@semillero.digital";

/// Deterministic demo data. Dates are laid out relative to `anchor`, so the
/// same anchor always yields the same payloads.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    anchor: DateTime<Utc>,
}

impl FixtureSource {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self { anchor }
    }

    fn course_index(course_id: &str) -> Result<usize, ClassroomError> {
        course_id
            .strip_prefix("mock-course-")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| (1..=COURSES.len()).contains(n))
            .ok_or_else(|| not_found(course_id))
    }

    fn course(n: usize) -> Course {
        let (name, section, state) = COURSES[n - 1];
        Course {
            id: format!("mock-course-{n}"),
            name: name.to_string(),
            section: section.map(str::to_string),
            enrollment_code: Some(format!("SEM{n:03}")),
            course_state: state.map(str::to_string),
            owner_id: Some(teacher_id(n)),
            alternate_link: Some(format!("https://classroom.google.com/c/mock{n}")),
        }
    }

    fn coursework_for(&self, n: usize) -> Vec<Coursework> {
        COURSEWORK
            .iter()
            .enumerate()
            .map(|(k, (title, offset))| {
                let due = self.anchor + Duration::days(*offset);
                Coursework {
                    id: format!("mock-cw-{n}-{}", k + 1),
                    course_id: Some(format!("mock-course-{n}")),
                    title: (*title).to_string(),
                    description: Some(format!("{title} – {}", COURSES[n - 1].0)),
                    state: Some("PUBLISHED".into()),
                    due_date: Some(DueDate {
                        year: due.year(),
                        month: due.month(),
                        day: due.day(),
                    }),
                    due_time: Some(TimeOfDay {
                        hours: Some(23),
                        minutes: Some(59),
                    }),
                    max_points: match k % 3 {
                        0 => Some(100.0),
                        1 => Some(10.0),
                        _ => None,
                    },
                    work_type: Some("ASSIGNMENT".into()),
                    alternate_link: Some(format!(
                        "https://classroom.google.com/c/mock{n}/a/{}",
                        k + 1
                    )),
                    creator_user_id: Some(teacher_id(n)),
                    topic_id: None,
                    creation_time: Some(self.anchor - Duration::days(20)),
                    update_time: Some(self.anchor - Duration::days(2)),
                }
            })
            .collect()
    }

    /// Submission of student `s` (1-based) for coursework `k` (0-based), or
    /// `None` for the rotation slots that model "never opened".
    fn submission(&self, n: usize, k: usize, s: usize) -> Option<Submission> {
        if (s + k) % 7 == 0 {
            return None;
        }
        let state = ROTATION[(s + k + n) % ROTATION.len()];
        let past_due = COURSEWORK[k].1 < 0;
        let turned_in = matches!(state, "TURNED_IN" | "RETURNED");
        let late = past_due && (!turned_in || (s + k) % 4 == 0);
        let max = match k % 3 {
            0 => Some(100.0),
            1 => Some(10.0),
            _ => None,
        };
        let assigned_grade = (state == "RETURNED").then(|| {
            let base = (6 + s % 5) as f64;
            match max {
                Some(m) => (m * base / 10.0).round(),
                None => base,
            }
        });
        Some(Submission {
            id: format!("mock-sub-{n}-{}-{s}", k + 1),
            coursework_id: Some(format!("mock-cw-{n}-{}", k + 1)),
            state: Some(state.to_string()),
            assigned_grade,
            alternate_link: Some(format!(
                "https://classroom.google.com/c/mock{n}/a/{}/submissions/{s}",
                k + 1
            )),
            late: Some(late),
            update_time: Some(self.anchor - Duration::days(1)),
            user_id: student_id(s),
        })
    }
}

fn student_id(s: usize) -> String {
    format!("mock-student-{s}")
}

fn teacher_id(n: usize) -> String {
    format!("mock-teacher-{}", (n - 1) % TEACHERS.len() + 1)
}

fn member(user_id: String, name: &str, handle: &str, org: &str) -> RosterMember {
    RosterMember {
        profile: Profile {
            id: user_id.clone(),
            name: name.to_string(),
            email: Some(format!("{handle}@{org}.{DOMAIN}")),
            photo_url: None,
        },
        user_id,
    }
}

fn not_found(what: &str) -> ClassroomError {
    ClassroomError::Api {
        status: 404,
        message: format!("Requested entity was not found: {what}"),
    }
}

#[async_trait]
impl ClassroomDataSource for FixtureSource {
    fn is_fixture(&self) -> bool {
        true
    }

    async fn profile(&self, _session: &Session) -> Result<Profile, ClassroomError> {
        Ok(Profile {
            id: "mock-coordinator".into(),
            name: "Coordinación Semillero".into(),
            email: Some(MOCK_EMAIL.into()),
            photo_url: None,
        })
    }

    async fn courses(&self, _session: &Session) -> Result<Vec<Course>, ClassroomError> {
        let teaching = [1, 2, 4].into_iter().map(Self::course).collect();
        let enrolled = [2, 3].into_iter().map(Self::course).collect();
        Ok(merge_courses(teaching, enrolled))
    }

    async fn students(
        &self,
        _session: &Session,
        course_id: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        Self::course_index(course_id)?;
        Ok(STUDENTS
            .iter()
            .enumerate()
            .map(|(i, (name, handle))| member(student_id(i + 1), name, handle, "alumnos"))
            .collect())
    }

    async fn teachers(
        &self,
        _session: &Session,
        course_id: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        let n = Self::course_index(course_id)?;
        let t = (n - 1) % TEACHERS.len();
        let (name, handle) = TEACHERS[t];
        Ok(vec![member(teacher_id(n), name, handle, "docentes")])
    }

    async fn coursework(
        &self,
        _session: &Session,
        course_id: &str,
    ) -> Result<Vec<Coursework>, ClassroomError> {
        let n = Self::course_index(course_id)?;
        Ok(self.coursework_for(n))
    }

    async fn submissions(
        &self,
        _session: &Session,
        course_id: &str,
        coursework_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<Submission>, ClassroomError> {
        let n = Self::course_index(course_id)?;
        let k = coursework_id
            .strip_prefix(&format!("mock-cw-{n}-"))
            .and_then(|k| k.parse::<usize>().ok())
            .filter(|k| (1..=COURSEWORK.len()).contains(k))
            .ok_or_else(|| not_found(coursework_id))?
            - 1;
        // `me` is the first fixture student.
        let wanted = user_id.map(|u| if u == "me" { student_id(1) } else { u.to_string() });
        Ok((1..=STUDENTS.len())
            .filter_map(|s| self.submission(n, k, s))
            .filter(|sub| wanted.as_deref().map_or(true, |u| sub.user_id == u))
            .collect())
    }

    async fn calendar_events(
        &self,
        _session: &Session,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, ClassroomError> {
        let min = query.time_min.as_deref().and_then(parse_instant);
        let max = query.time_max.as_deref().and_then(parse_instant);
        let utc = Utc.fix();
        let day_start = self
            .anchor
            .with_hour(0)
            .and_then(|d| d.with_minute(0))
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(self.anchor);

        Ok(EVENTS
            .iter()
            .enumerate()
            .map(|(i, (summary, offset, online))| {
                let start = day_start + Duration::days(*offset) + Duration::hours(15);
                let end = start + Duration::hours(1);
                CalendarEvent {
                    id: format!("mock-event-{}", i + 1),
                    summary: (*summary).to_string(),
                    start: EventTime {
                        date_time: Some(start.with_timezone(&utc)),
                        date: None,
                        time_zone: Some("UTC".into()),
                    },
                    end: EventTime {
                        date_time: Some(end.with_timezone(&utc)),
                        date: None,
                        time_zone: Some("UTC".into()),
                    },
                    location: (!online).then(|| "Sede Semillero".to_string()),
                    hangout_link: online
                        .then(|| format!("https://meet.google.com/mock-{}", i + 1)),
                    attendees: vec![Attendee {
                        email: Some(MOCK_EMAIL.into()),
                        display_name: Some("Coordinación Semillero".into()),
                        response_status: Some("accepted".into()),
                    }],
                }
            })
            .filter(|e| {
                let start = e.start.date_time.map(|d| d.with_timezone(&Utc));
                let after_min = match (min, start) {
                    (Some(min), Some(start)) => start >= min,
                    _ => true,
                };
                let before_max = match (max, start) {
                    (Some(max), Some(start)) => start < max,
                    _ => true,
                };
                after_min && before_max
            })
            .collect())
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixture() -> FixtureSource {
        FixtureSource::new(Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn archived_fixture_course_is_hidden() {
        let courses = fixture().courses(&Session::Anonymous).await.unwrap();
        let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["mock-course-1", "mock-course-2", "mock-course-3"]);
    }

    #[tokio::test]
    async fn same_anchor_same_payload() {
        let a = fixture();
        let b = fixture();
        let s = Session::Anonymous;
        let left = serde_json::to_string(&a.coursework(&s, "mock-course-1").await.unwrap()).unwrap();
        let right = serde_json::to_string(&b.coursework(&s, "mock-course-1").await.unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[tokio::test]
    async fn due_dates_are_relative_to_anchor() {
        let cw = fixture()
            .coursework(&Session::Anonymous, "mock-course-2")
            .await
            .unwrap();
        assert_eq!(cw.len(), 5);
        assert_eq!(
            cw[2].due_date,
            Some(DueDate { year: 2026, month: 10, day: 20 })
        );
    }

    #[tokio::test]
    async fn some_students_have_no_submission_row() {
        let fx = fixture();
        let s = Session::Anonymous;
        let mut total = 0;
        for k in 1..=5 {
            let subs = fx
                .submissions(&s, "mock-course-1", &format!("mock-cw-1-{k}"), None)
                .await
                .unwrap();
            total += subs.len();
        }
        assert!(total < 30, "expected gaps, got {total}");
        assert!(total > 20);
    }

    #[tokio::test]
    async fn me_resolves_to_first_student() {
        let subs = fixture()
            .submissions(&Session::Anonymous, "mock-course-1", "mock-cw-1-1", Some("me"))
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].user_id, "mock-student-1");
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let fx = fixture();
        let s = Session::Anonymous;
        assert!(matches!(
            fx.students(&s, "nope").await,
            Err(ClassroomError::Api { status: 404, .. })
        ));
        assert!(matches!(
            fx.submissions(&s, "mock-course-1", "mock-cw-2-1", None).await,
            Err(ClassroomError::Api { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn events_respect_time_window() {
        let query = EventQuery {
            calendar_id: "primary".into(),
            time_min: Some("2026-10-19T00:00:00Z".into()),
            time_max: Some("2026-10-21T00:00:00Z".into()),
        };
        let events = fixture()
            .calendar_events(&Session::Anonymous, &query)
            .await
            .unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["mock-event-1", "mock-event-2"]);
    }
}
