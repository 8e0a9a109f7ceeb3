use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::Submission;
use crate::preferences::Language;

/// The four-way simplification of Classroom's submission states that every
/// dashboard, table and rule works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeVariant {
    Default,
    Secondary,
    Destructive,
}

/// Classify a raw submission. First match wins:
/// completed, then overdue, then pending, else in progress.
///
/// A late submission that was turned in is `Completed`.
pub fn status_to_key(state: Option<&str>, late: Option<bool>) -> CanonicalStatus {
    match state {
        Some("TURNED_IN" | "RETURNED" | "COMPLETED") => CanonicalStatus::Completed,
        _ if state == Some("OVERDUE") || late == Some(true) => CanonicalStatus::Overdue,
        Some("NO_SUBMISSION" | "PENDING") => CanonicalStatus::Pending,
        _ => CanonicalStatus::InProgress,
    }
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 4] = [
        CanonicalStatus::Pending,
        CanonicalStatus::InProgress,
        CanonicalStatus::Completed,
        CanonicalStatus::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }

    pub fn label(self, lang: Language) -> &'static str {
        match (lang, self) {
            (Language::Es, Self::Pending) => "Pendiente",
            (Language::Es, Self::InProgress) => "En progreso",
            (Language::Es, Self::Completed) => "Completado",
            (Language::Es, Self::Overdue) => "Atrasado",
            (Language::En, Self::Pending) => "Pending",
            (Language::En, Self::InProgress) => "In progress",
            (Language::En, Self::Completed) => "Completed",
            (Language::En, Self::Overdue) => "Overdue",
        }
    }

    pub fn badge_variant(self) -> BadgeVariant {
        match self {
            Self::Completed => BadgeVariant::Default,
            Self::Overdue => BadgeVariant::Destructive,
            Self::Pending | Self::InProgress => BadgeVariant::Secondary,
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for CanonicalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Anything a canonical status can be derived from.
pub trait Classified {
    fn status_key(&self) -> CanonicalStatus;
}

impl Classified for Submission {
    fn status_key(&self) -> CanonicalStatus {
        status_to_key(self.state.as_deref(), self.late)
    }
}

// ─── Grades ─────────────────────────────────────────────────────────────────

/// `"8"` without a maximum, `"8 / 10 (80%)"` with one, `None` when there is
/// no numeric grade.
pub fn format_grade(assigned: Option<f64>, max_points: Option<f64>) -> Option<String> {
    let assigned = assigned.filter(|g| g.is_finite())?;
    match max_points.filter(|m| m.is_finite() && *m > 0.0) {
        Some(max) => {
            let pct = (assigned / max * 100.0).round();
            Some(format!(
                "{} / {} ({}%)",
                format_number(assigned),
                format_number(max),
                format_number(pct)
            ))
        }
        None => Some(format_number(assigned)),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        let s = format!("{n:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [Option<&str>; 10] = [
        None,
        Some("NEW"),
        Some("CREATED"),
        Some("TURNED_IN"),
        Some("RETURNED"),
        Some("RECLAIMED_BY_STUDENT"),
        Some("COMPLETED"),
        Some("OVERDUE"),
        Some("NO_SUBMISSION"),
        Some("PENDING"),
    ];

    #[test]
    fn every_combination_maps_to_one_key() {
        for state in STATES {
            for late in [None, Some(false), Some(true)] {
                let key = status_to_key(state, late);
                assert!(CanonicalStatus::ALL.contains(&key));
                assert_eq!(key, status_to_key(state, late));
            }
        }
    }

    #[test]
    fn completion_wins_over_lateness() {
        assert_eq!(
            status_to_key(Some("TURNED_IN"), Some(true)),
            CanonicalStatus::Completed
        );
        assert_eq!(
            status_to_key(Some("RETURNED"), Some(true)),
            CanonicalStatus::Completed
        );
    }

    #[test]
    fn lateness_wins_over_pending() {
        assert_eq!(
            status_to_key(Some("NO_SUBMISSION"), Some(true)),
            CanonicalStatus::Overdue
        );
        assert_eq!(status_to_key(Some("OVERDUE"), None), CanonicalStatus::Overdue);
        assert_eq!(status_to_key(Some("CREATED"), Some(true)), CanonicalStatus::Overdue);
    }

    #[test]
    fn remaining_states() {
        assert_eq!(status_to_key(Some("PENDING"), None), CanonicalStatus::Pending);
        assert_eq!(
            status_to_key(Some("NO_SUBMISSION"), Some(false)),
            CanonicalStatus::Pending
        );
        assert_eq!(status_to_key(Some("CREATED"), None), CanonicalStatus::InProgress);
        assert_eq!(
            status_to_key(Some("RECLAIMED_BY_STUDENT"), Some(false)),
            CanonicalStatus::InProgress
        );
        assert_eq!(status_to_key(None, None), CanonicalStatus::InProgress);
    }

    #[test]
    fn labels_and_badges() {
        assert_eq!(CanonicalStatus::Overdue.label(Language::Es), "Atrasado");
        assert_eq!(CanonicalStatus::InProgress.label(Language::En), "In progress");
        assert_eq!(CanonicalStatus::Completed.badge_variant(), BadgeVariant::Default);
        assert_eq!(CanonicalStatus::Overdue.badge_variant(), BadgeVariant::Destructive);
        assert_eq!(CanonicalStatus::Pending.badge_variant(), BadgeVariant::Secondary);
        assert_eq!(CanonicalStatus::InProgress.badge_variant(), BadgeVariant::Secondary);
    }

    #[test]
    fn keys_round_trip_through_strings() {
        assert_eq!("in_progress".parse::<CanonicalStatus>().unwrap(), CanonicalStatus::InProgress);
        assert!("done".parse::<CanonicalStatus>().is_err());
    }

    #[test]
    fn grade_formatting() {
        assert_eq!(format_grade(Some(8.0), Some(10.0)).as_deref(), Some("8 / 10 (80%)"));
        assert_eq!(format_grade(Some(8.0), None).as_deref(), Some("8"));
        assert_eq!(format_grade(None, Some(10.0)), None);
        assert_eq!(format_grade(Some(f64::NAN), Some(10.0)), None);
        assert_eq!(format_grade(Some(7.5), Some(9.0)).as_deref(), Some("7.5 / 9 (83%)"));
        assert_eq!(format_grade(Some(3.0), Some(0.0)).as_deref(), Some("3"));
    }
}
