//! Course-scoped rollups shared by the coordinator, teacher and student
//! dashboards: roster × coursework joined against submissions.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::api::ClassroomError;
use crate::models::*;
use crate::preferences::Language;
use crate::session::Session;
use crate::source::ClassroomDataSource;
use crate::status::{format_grade, BadgeVariant, CanonicalStatus, Classified};

/// Charts want at least this many points on the progress line.
const MIN_SERIES_POINTS: usize = 5;

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// Everything fetched for one course before any counting happens.
#[derive(Debug, Clone, Default)]
pub struct CourseSnapshot {
    pub course_id: String,
    pub students: Vec<RosterMember>,
    pub coursework: Vec<Coursework>,
    /// Keyed by coursework id. Items whose fetch failed map to nothing.
    pub submissions: HashMap<String, Vec<Submission>>,
}

impl CourseSnapshot {
    /// The member's submission for a coursework item, or a synthesized
    /// `NO_SUBMISSION` record when there is none.
    pub fn submission_for(&self, coursework_id: &str, user_id: &str) -> Submission {
        self.submissions
            .get(coursework_id)
            .and_then(|subs| subs.iter().find(|s| s.user_id == user_id))
            .cloned()
            .unwrap_or_else(|| Submission::missing(coursework_id, user_id))
    }
}

/// Fetch roster, coursework and every coursework item's submissions.
///
/// Roster and coursework failures abort. A failing submissions call only
/// blanks that one item.
pub async fn fetch_course_snapshot(
    source: Arc<dyn ClassroomDataSource>,
    session: &Session,
    course_id: &str,
) -> Result<CourseSnapshot, ClassroomError> {
    let (students, coursework) = tokio::try_join!(
        source.students(session, course_id),
        source.coursework(session, course_id),
    )?;

    let mut tasks = JoinSet::new();
    for item in &coursework {
        let source = Arc::clone(&source);
        let session = session.clone();
        let course_id = course_id.to_string();
        let coursework_id = item.id.clone();
        tasks.spawn(async move {
            let result = source
                .submissions(&session, &course_id, &coursework_id, None)
                .await;
            (coursework_id, result)
        });
    }

    let mut submissions = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((coursework_id, Ok(subs))) => {
                submissions.insert(coursework_id, subs);
            }
            Ok((coursework_id, Err(e))) => {
                warn!(
                    course_id = %course_id,
                    coursework_id = %coursework_id,
                    error = %e,
                    "submissions fetch failed; counting as empty"
                );
            }
            Err(e) => warn!(course_id = %course_id, error = %e, "submissions task aborted"),
        }
    }
    debug!(
        course_id = %course_id,
        students = students.len(),
        coursework = coursework.len(),
        "course snapshot fetched"
    );

    Ok(CourseSnapshot {
        course_id: course_id.to_string(),
        students,
        coursework,
        submissions,
    })
}

// ─── Rollups ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub completed: usize,
    pub overdue: usize,
    pub pending: usize,
    pub in_progress: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: CanonicalStatus) {
        match status {
            CanonicalStatus::Completed => self.completed += 1,
            CanonicalStatus::Overdue => self.overdue += 1,
            CanonicalStatus::Pending => self.pending += 1,
            CanonicalStatus::InProgress => self.in_progress += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.overdue + self.pending + self.in_progress
    }

    fn add(&mut self, other: &StatusCounts) {
        self.completed += other.completed;
        self.overdue += other.overdue;
        self.pending += other.pending;
        self.in_progress += other.in_progress;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub completion_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTotals {
    pub students: usize,
    pub coursework: usize,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub completion_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPoint {
    pub week: String,
    pub completion_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: String,
    pub totals: CourseTotals,
    pub students: Vec<StudentProgress>,
    pub weekly: Vec<WeeklyPoint>,
}

/// `round(completed / total * 100)`, with an empty denominator reading 0%.
pub fn completion_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

pub fn course_progress(snapshot: &CourseSnapshot) -> CourseProgress {
    let coursework_count = snapshot.coursework.len();
    let mut course_counts = StatusCounts::default();

    let students: Vec<StudentProgress> = snapshot
        .students
        .iter()
        .map(|member| {
            let mut counts = StatusCounts::default();
            for item in &snapshot.coursework {
                let sub = snapshot.submission_for(&item.id, &member.user_id);
                counts.record(sub.status_key());
            }
            course_counts.add(&counts);
            StudentProgress {
                user_id: member.user_id.clone(),
                name: member.profile.name.clone(),
                email: member.profile.email.clone(),
                completion_pct: completion_percentage(counts.completed, coursework_count),
                counts,
            }
        })
        .collect();

    CourseProgress {
        course_id: snapshot.course_id.clone(),
        totals: CourseTotals {
            students: snapshot.students.len(),
            coursework: coursework_count,
            completion_pct: completion_percentage(course_counts.completed, course_counts.total()),
            counts: course_counts,
        },
        students,
        weekly: weekly_progress(snapshot),
    }
}

/// Cumulative completion by due-date ISO week.
///
/// Each point is the share of all dated (student, coursework) slots that were
/// completed by items due up to and including that week. Weeks without
/// coursework produce no point. Short series are padded with their last value.
pub fn weekly_progress(snapshot: &CourseSnapshot) -> Vec<WeeklyPoint> {
    let mut weeks: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    let mut dated = 0usize;
    for item in &snapshot.coursework {
        let Some(due) = item.due_at() else {
            continue;
        };
        dated += 1;
        let completed = snapshot
            .students
            .iter()
            .filter(|m| {
                snapshot.submission_for(&item.id, &m.user_id).status_key()
                    == CanonicalStatus::Completed
            })
            .count();
        *weeks.entry(iso_week(due)).or_default() += completed;
    }

    let slots = dated * snapshot.students.len();
    if slots == 0 {
        return Vec::new();
    }

    let mut cumulative = 0;
    let mut series: Vec<WeeklyPoint> = weeks
        .into_iter()
        .map(|((year, week), completed)| {
            cumulative += completed;
            WeeklyPoint {
                week: format!("{year}-W{week:02}"),
                completion_pct: completion_percentage(cumulative, slots),
            }
        })
        .collect();

    if let Some(last) = series.last().cloned() {
        while series.len() < MIN_SERIES_POINTS {
            series.push(last.clone());
        }
    }
    series
}

fn iso_week(at: DateTime<Utc>) -> (i32, u32) {
    let week = at.iso_week();
    (week.year(), week.week())
}

// ─── Rows ───────────────────────────────────────────────────────────────────

/// One roster member's standing on one coursework item, ready for a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRow {
    pub user_id: String,
    pub student_name: String,
    pub email: Option<String>,
    pub coursework_id: String,
    pub submission_id: Option<String>,
    pub state: String,
    pub late: bool,
    pub status: CanonicalStatus,
    pub status_label: String,
    pub badge: BadgeVariant,
    pub grade: Option<String>,
    pub alternate_link: Option<String>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Classified for SubmissionRow {
    fn status_key(&self) -> CanonicalStatus {
        self.status
    }
}

/// Rows for every roster member on `coursework`, in roster order. Members
/// with no submission appear as `NO_SUBMISSION`.
pub fn submission_rows(
    students: &[RosterMember],
    coursework: &Coursework,
    submissions: &[Submission],
    lang: Language,
) -> Vec<SubmissionRow> {
    students
        .iter()
        .map(|member| {
            let found = submissions.iter().find(|s| s.user_id == member.user_id);
            let sub = found
                .cloned()
                .unwrap_or_else(|| Submission::missing(&coursework.id, &member.user_id));
            let status = sub.status_key();
            SubmissionRow {
                user_id: member.user_id.clone(),
                student_name: member.profile.name.clone(),
                email: member.profile.email.clone(),
                coursework_id: coursework.id.clone(),
                submission_id: found.map(|s| s.id.clone()),
                state: sub.state.clone().unwrap_or_else(|| NO_SUBMISSION.into()),
                late: sub.late.unwrap_or(false),
                status,
                status_label: status.label(lang).to_string(),
                badge: status.badge_variant(),
                grade: format_grade(sub.assigned_grade, coursework.max_points),
                alternate_link: sub.alternate_link.clone(),
                update_time: sub.update_time,
            }
        })
        .collect()
}
