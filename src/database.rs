//! Stand-in for the relational store. Queries are matched on their SQL text
//! and answered with canned rows; nothing is actually connected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("DATABASE_URL is not configured")]
    NotConfigured,
    #[error("Unsupported query: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Value>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

impl QueryResult {
    fn new(rows: Vec<Value>) -> Self {
        Self {
            row_count: rows.len(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitReport {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub tables: Vec<String>,
}

const TABLES: [&str; 4] = ["courses", "students", "coursework", "submissions"];

#[derive(Debug, Clone)]
pub struct Database {
    url: Option<String>,
}

impl Database {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn query(&self, sql: &str) -> Result<QueryResult, DatabaseError> {
        let normalized = sql.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        debug!(sql = %normalized, "database query");

        let rows = if normalized.contains("SELECT NOW()") {
            vec![json!({ "now": Utc::now() })]
        } else if normalized.starts_with("SELECT 1") {
            vec![json!({ "?column?": 1 })]
        } else if normalized.starts_with("CREATE TABLE") {
            Vec::new()
        } else if normalized.starts_with("SELECT") && normalized.contains("FROM COURSES") {
            vec![
                json!({ "id": "course-1", "name": "Programación Web", "state": "ACTIVE" }),
                json!({ "id": "course-2", "name": "Diseño UX", "state": "ACTIVE" }),
            ]
        } else if normalized.starts_with("SELECT") && normalized.contains("FROM STUDENTS") {
            vec![
                json!({ "id": "student-1", "name": "Ana Gómez", "email": "ana@alumnos.semillero.digital" }),
                json!({ "id": "student-2", "name": "Bruno Díaz", "email": "bruno@alumnos.semillero.digital" }),
            ]
        } else {
            return Err(DatabaseError::Unsupported(sql.trim().to_string()));
        };
        Ok(QueryResult::new(rows))
    }

    /// Connectivity probe plus schema bootstrap.
    pub fn init(&self) -> Result<InitReport, DatabaseError> {
        if !self.is_configured() {
            return Err(DatabaseError::NotConfigured);
        }
        self.query("SELECT NOW()")?;
        for table in TABLES {
            self.query(&format!("CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY)"))?;
        }
        info!(tables = TABLES.len(), "database initialized");
        Ok(InitReport {
            success: true,
            message: "Database connection OK".into(),
            timestamp: Utc::now(),
            tables: TABLES.iter().map(|t| t.to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_rows_follow_the_sql_text() {
        let db = Database::new(Some("postgres://localhost/semillero".into()));
        assert_eq!(db.query("select 1").unwrap().row_count, 1);
        assert_eq!(db.query("SELECT  id, name\n FROM courses").unwrap().row_count, 2);
        assert_eq!(db.query("select * from students where id = $1").unwrap().rows.len(), 2);
        assert!(db.query("SELECT NOW()").unwrap().rows[0].get("now").is_some());
    }

    #[test]
    fn unknown_sql_is_an_error() {
        let db = Database::new(None);
        assert_eq!(
            db.query("DELETE FROM courses"),
            Err(DatabaseError::Unsupported("DELETE FROM courses".into()))
        );
    }

    #[test]
    fn init_needs_a_url() {
        assert_eq!(Database::new(None).init(), Err(DatabaseError::NotConfigured));
        assert_eq!(Database::new(Some("  ".into())).init(), Err(DatabaseError::NotConfigured));

        let report = Database::new(Some("postgres://db".into())).init().unwrap();
        assert!(report.success);
        assert_eq!(report.tables, vec!["courses", "students", "coursework", "submissions"]);
    }
}
