use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ─── Courses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub section: Option<String>,
    pub enrollment_code: Option<String>,
    pub course_state: Option<String>,
    pub owner_id: Option<String>,
    pub alternate_link: Option<String>,
}

impl Course {
    /// Courses without a state are treated as visible, same as active and
    /// provisioned ones. Archived, declined and suspended courses are hidden.
    pub fn is_visible(&self) -> bool {
        matches!(
            self.course_state.as_deref(),
            None | Some("ACTIVE") | Some("PROVISIONED")
        )
    }
}

// ─── Roster ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

/// A student or teacher enrolled in a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub user_id: String,
    pub profile: Profile,
}

// ─── Coursework ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Classroom omits zero-valued fields, so midnight arrives as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hours: Option<u32>,
    pub minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coursework {
    pub id: String,
    pub course_id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub state: Option<String>,
    pub due_date: Option<DueDate>,
    pub due_time: Option<TimeOfDay>,
    pub max_points: Option<f64>,
    pub work_type: Option<String>,
    pub alternate_link: Option<String>,
    pub creator_user_id: Option<String>,
    pub topic_id: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Coursework {
    /// Due instant in UTC. A due date without a due time is due at the end of
    /// that day.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        let date = self.due_date?;
        let day = NaiveDate::from_ymd_opt(date.year, date.month, date.day)?;
        let naive = match self.due_time {
            Some(t) => day.and_hms_opt(t.hours.unwrap_or(0), t.minutes.unwrap_or(0), 0)?,
            None => day.and_hms_opt(23, 59, 59)?,
        };
        Some(Utc.from_utc_datetime(&naive))
    }
}

// ─── Submissions ────────────────────────────────────────────────────────────

pub const NO_SUBMISSION: &str = "NO_SUBMISSION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    #[serde(rename = "courseworkId", alias = "courseWorkId")]
    pub coursework_id: Option<String>,
    pub state: Option<String>,
    pub assigned_grade: Option<f64>,
    pub alternate_link: Option<String>,
    pub late: Option<bool>,
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: String,
}

impl Submission {
    /// Placeholder for a roster member who has no submission row for a
    /// coursework item.
    pub fn missing(coursework_id: &str, user_id: &str) -> Self {
        Self {
            id: format!("{coursework_id}:{user_id}:none"),
            coursework_id: Some(coursework_id.to_string()),
            state: Some(NO_SUBMISSION.to_string()),
            assigned_grade: None,
            alternate_link: None,
            late: None,
            update_time: None,
            user_id: user_id.to_string(),
        }
    }
}

// ─── Calendar ───────────────────────────────────────────────────────────────

/// Timed events carry `dateTime`; all-day events carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: Option<DateTime<FixedOffset>>,
    pub date: Option<NaiveDate>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    pub location: Option<String>,
    pub hangout_link: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub calendar_id: String,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
}

// ─── Upstream profile shapes ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamName {
    pub full_name: Option<String>,
}

/// `UserProfile` as returned by the Classroom API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamProfile {
    pub id: Option<String>,
    #[serde(default)]
    pub name: UpstreamName,
    pub email_address: Option<String>,
    pub photo_url: Option<String>,
}

/// `Student` / `Teacher` roster entry as returned by the Classroom API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamRosterEntry {
    pub user_id: String,
    #[serde(default)]
    pub profile: UpstreamProfile,
}

impl From<UpstreamProfile> for Profile {
    fn from(raw: UpstreamProfile) -> Self {
        // Classroom hands out protocol-relative photo URLs.
        let photo_url = raw.photo_url.map(|url| {
            if url.starts_with("//") {
                format!("https:{url}")
            } else {
                url
            }
        });
        Self {
            id: raw.id.unwrap_or_default(),
            name: raw.name.full_name.unwrap_or_else(|| "Sin nombre".into()),
            email: raw.email_address,
            photo_url,
        }
    }
}

impl From<UpstreamRosterEntry> for RosterMember {
    fn from(raw: UpstreamRosterEntry) -> Self {
        let mut profile = Profile::from(raw.profile);
        if profile.id.is_empty() {
            profile.id = raw.user_id.clone();
        }
        Self {
            user_id: raw.user_id,
            profile,
        }
    }
}
