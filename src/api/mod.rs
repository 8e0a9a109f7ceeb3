pub mod pagination;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::models::*;
use pagination::{parse_page, Page};

const USER_AGENT: &str = "semillero/0.1.0";
const PAGE_SIZE: &str = "100";

// ─── Error types ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClassroomError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unauthorized – connect your Google account")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

// ─── Shared REST plumbing ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RestClient {
    client: Client,
    base_url: Url,
}

impl RestClient {
    fn new(base_url: &str) -> Result<Self> {
        let mut normalized = base_url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("Invalid API URL: {base_url}"))?;

        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self { client, base_url })
    }

    /// Append percent-encoded path segments to the base URL.
    fn api_url(&self, segments: &[&str]) -> Result<Url, ClassroomError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check_status(resp: Response) -> Result<Response, ClassroomError> {
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(ClassroomError::Unauthorized),
            s if s.is_client_error() || s.is_server_error() => {
                let status = s.as_u16();
                let text = resp.text().await.unwrap_or_default();
                Err(ClassroomError::Api {
                    status,
                    message: upstream_message(&text),
                })
            }
            _ => Ok(resp),
        }
    }

    async fn get_value(
        &self,
        url: Url,
        token: &str,
    ) -> Result<Value, ClassroomError> {
        debug!(%url, "upstream GET");
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        token: &str,
    ) -> Result<T, ClassroomError> {
        let url = self.api_url(segments)?;
        let value = self.get_value(url, token).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
        field: &str,
        page_token: Option<&str>,
        token: &str,
    ) -> Result<Page<T>, ClassroomError> {
        let mut url = self.api_url(segments)?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            if let Some(page_token) = page_token {
                query.append_pair("pageToken", page_token);
            }
        }
        let value = self.get_value(url, token).await?;
        Ok(parse_page(value, field)?)
    }

    /// Follow `nextPageToken` until the listing is exhausted.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
        field: &str,
        token: &str,
    ) -> Result<Vec<T>, ClassroomError> {
        let mut all = Vec::new();
        let mut next: Option<String> = None;
        loop {
            let page = self
                .get_page(segments, params, field, next.as_deref(), token)
                .await?;
            all.extend(page.items);
            match page.next_page_token {
                Some(t) => next = Some(t),
                None => break,
            }
        }
        Ok(all)
    }
}

/// Google wraps errors as `{"error": {"message": ...}}`; fall back to the
/// raw body otherwise.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// ─── Classroom ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClassroomClient {
    rest: RestClient,
}

impl ClassroomClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(base_url)?,
        })
    }

    // ── Courses ─────────────────────────────────────────────────────────

    /// All courses where `me` holds the given role (`teacherId` or
    /// `studentId`), every page.
    pub async fn list_courses_as(
        &self,
        role_param: &str,
        token: &str,
    ) -> Result<Vec<Course>, ClassroomError> {
        self.rest
            .get_all_pages(
                &["courses"],
                &[(role_param, "me"), ("pageSize", PAGE_SIZE)],
                "courses",
                token,
            )
            .await
    }

    // ── Rosters ─────────────────────────────────────────────────────────

    /// First page only; rosters are not followed past `nextPageToken`.
    pub async fn list_students(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        self.roster(course_id, "students", token).await
    }

    pub async fn list_teachers(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        self.roster(course_id, "teachers", token).await
    }

    async fn roster(
        &self,
        course_id: &str,
        kind: &str,
        token: &str,
    ) -> Result<Vec<RosterMember>, ClassroomError> {
        let page: Page<UpstreamRosterEntry> = self
            .rest
            .get_page(&["courses", course_id, kind], &[], kind, None, token)
            .await?;
        Ok(page.items.into_iter().map(RosterMember::from).collect())
    }

    // ── Coursework ──────────────────────────────────────────────────────

    pub async fn list_coursework(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<Coursework>, ClassroomError> {
        self.rest
            .get_all_pages(
                &["courses", course_id, "courseWork"],
                &[("pageSize", PAGE_SIZE)],
                "courseWork",
                token,
            )
            .await
    }

    // ── Submissions ─────────────────────────────────────────────────────

    pub async fn list_submissions(
        &self,
        course_id: &str,
        coursework_id: &str,
        user_id: Option<&str>,
        token: &str,
    ) -> Result<Vec<Submission>, ClassroomError> {
        let mut params = vec![("pageSize", PAGE_SIZE)];
        if let Some(user_id) = user_id {
            params.push(("userId", user_id));
        }
        self.rest
            .get_all_pages(
                &["courses", course_id, "courseWork", coursework_id, "studentSubmissions"],
                &params,
                "studentSubmissions",
                token,
            )
            .await
    }

    // ── User / Profile ──────────────────────────────────────────────────

    pub async fn get_profile(&self, token: &str) -> Result<Profile, ClassroomError> {
        let raw: UpstreamProfile = self.rest.get_json(&["userProfiles", "me"], token).await?;
        Ok(Profile::from(raw))
    }
}

// ─── Calendar ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CalendarClient {
    rest: RestClient,
}

impl CalendarClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(base_url)?,
        })
    }

    /// Expanded (single) events ordered by start time.
    pub async fn list_events(
        &self,
        query: &EventQuery,
        token: &str,
    ) -> Result<Vec<CalendarEvent>, ClassroomError> {
        let mut params = vec![("singleEvents", "true"), ("orderBy", "startTime")];
        if let Some(min) = query.time_min.as_deref() {
            params.push(("timeMin", min));
        }
        if let Some(max) = query.time_max.as_deref() {
            params.push(("timeMax", max));
        }
        self.rest
            .get_all_pages(
                &["calendars", query.calendar_id.as_str(), "events"],
                &params,
                "items",
                token,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_encodes_segments() {
        let rest = RestClient::new("https://www.googleapis.com/calendar/v3").unwrap();
        let url = rest
            .api_url(&["calendars", "es.ar#holiday@group.v.calendar.google.com", "events"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/es.ar%23holiday@group.v.calendar.google.com/events"
        );
    }

    #[test]
    fn upstream_message_prefers_google_error_body() {
        let body = r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#;
        assert_eq!(upstream_message(body), "The caller does not have permission");
        assert_eq!(upstream_message("bad gateway\n"), "bad gateway");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(ClassroomClient::new("not a url").is_err());
    }
}
