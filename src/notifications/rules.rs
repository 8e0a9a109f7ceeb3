use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{Notification, NotificationKind, NotificationSettings, Priority};
use crate::models::{Course, Coursework, Submission};
use crate::status::{format_grade, CanonicalStatus, Classified};

const UPCOMING_WINDOW_DAYS: i64 = 3;
pub const MORNING_HOUR: u32 = 9;
pub const EVENING_HOUR: u32 = 18;

/// One course worth of a user's work: coursework plus that user's own
/// submissions keyed by coursework id.
pub struct CourseActivity<'a> {
    pub course: &'a Course,
    pub coursework: &'a [Coursework],
    pub submissions: &'a HashMap<String, Submission>,
}

/// Notifications the deadline, overdue and grade rules produce for `user_id`
/// at `now`. Each carries a dedupe key so that re-running the rules on the
/// same data does not pile up duplicates.
pub fn evaluate(
    activity: &CourseActivity<'_>,
    user_id: &str,
    settings: &NotificationSettings,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let today = now.date_naive();
    let mut out = Vec::new();

    for item in activity.coursework {
        let sub = activity.submissions.get(&item.id);
        let done = sub.is_some_and(|s| s.status_key() == CanonicalStatus::Completed);

        if let Some(due) = item.due_at() {
            let days_left = (due.date_naive() - today).num_days();
            if !done && due > now && days_left <= UPCOMING_WINDOW_DAYS {
                if settings.categories.deadlines {
                    let priority = if days_left <= 1 {
                        Priority::High
                    } else {
                        Priority::Medium
                    };
                    let when = match days_left {
                        0 => "hoy".to_string(),
                        1 => "mañana".to_string(),
                        n => format!("en {n} días"),
                    };
                    out.push(attach(
                        Notification::new(
                            NotificationKind::Deadline,
                            priority,
                            "Entrega próxima",
                            format!("«{}» de {} vence {when}.", item.title, activity.course.name),
                            user_id,
                            now,
                        ),
                        activity.course,
                        item,
                        format!("deadline:{}:{}:{today}", activity.course.id, item.id),
                    ));
                }
            } else if !done && due <= now && settings.categories.overdue {
                out.push(attach(
                    Notification::new(
                        NotificationKind::Overdue,
                        Priority::High,
                        "Entrega vencida",
                        format!(
                            "«{}» de {} venció el {} y no fue entregada.",
                            item.title,
                            activity.course.name,
                            due.format("%d/%m")
                        ),
                        user_id,
                        now,
                    ),
                    activity.course,
                    item,
                    format!("overdue:{}:{}:{today}", activity.course.id, item.id),
                ));
            }
        }

        if settings.categories.grades {
            if let Some(grade) = sub
                .and_then(|s| s.assigned_grade)
                .filter(|g| g.is_finite() && *g > 0.0)
            {
                let shown = format_grade(Some(grade), item.max_points).unwrap_or_default();
                out.push(attach(
                    Notification::new(
                        NotificationKind::Grade,
                        Priority::Low,
                        "Calificación disponible",
                        format!("Obtuviste {shown} en «{}».", item.title),
                        user_id,
                        now,
                    ),
                    activity.course,
                    item,
                    format!("grade:{}:{}:{user_id}", activity.course.id, item.id),
                ));
            }
        }
    }
    out
}

fn attach(
    mut notification: Notification,
    course: &Course,
    item: &Coursework,
    dedupe_key: String,
) -> Notification {
    notification.course_id = Some(course.id.clone());
    notification.coursework_id = Some(item.id.clone());
    notification.action_url = item.alternate_link.clone();
    notification.dedupe_key = Some(dedupe_key);
    notification
}

/// Canned reminders for the morning and evening check-ins. Any other hour,
/// or reminders switched off, yields nothing.
pub fn time_of_day_reminders(
    user_id: &str,
    settings: &NotificationSettings,
    local_hour: u32,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    if !settings.categories.reminders {
        return Vec::new();
    }
    let (priority, title, message) = match local_hour {
        MORNING_HOUR => (
            Priority::Low,
            "Buen día",
            "Revisá tus tareas pendientes y las clases de hoy.",
        ),
        EVENING_HOUR => (
            Priority::Medium,
            "Resumen del día",
            "Antes de cerrar el día, verificá si quedaron entregas por subir.",
        ),
        _ => return Vec::new(),
    };
    let mut n = Notification::new(NotificationKind::Reminder, priority, title, message, user_id, now);
    n.dedupe_key = Some(format!("reminder:{}:{local_hour}", now.date_naive()));
    vec![n]
}
