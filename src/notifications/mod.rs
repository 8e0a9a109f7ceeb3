//! In-app notifications: records, per-user settings, the bounded per-user
//! store, the rule engine that generates entries from Classroom data, the
//! time-of-day reminder timer, and the (stubbed) outbound delivery channels.

pub mod delivery;
pub mod reminders;
pub mod rules;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::local_store::LocalStore;
use reminders::ReminderTimer;
pub use store::NotificationStore;

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Deadline,
    Overdue,
    Grade,
    Reminder,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub user_id: String,
    pub course_id: Option<String>,
    pub coursework_id: Option<String>,
    pub action_url: Option<String>,
    /// Same key means same logical notification; the store keeps one.
    pub dedupe_key: Option<String>,
}

static SEQ: AtomicU64 = AtomicU64::new(0);

impl Notification {
    pub fn new(
        kind: NotificationKind,
        priority: Priority,
        title: impl Into<String>,
        message: impl Into<String>,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("n-{}-{seq}", timestamp.timestamp_millis()),
            title: title.into(),
            message: message.into(),
            kind,
            priority,
            timestamp,
            read: false,
            user_id: user_id.to_string(),
            course_id: None,
            coursework_id: None,
            action_url: None,
            dedupe_key: None,
        }
    }
}

// ─── Settings ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelToggles {
    pub in_app: bool,
    pub email: bool,
    pub whatsapp: bool,
    pub telegram: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            in_app: true,
            email: true,
            whatsapp: false,
            telegram: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryToggles {
    pub deadlines: bool,
    pub overdue: bool,
    pub grades: bool,
    pub reminders: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            deadlines: true,
            overdue: true,
            grades: true,
            reminders: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub channels: ChannelToggles,
    pub categories: CategoryToggles,
}

// ─── Hub ─────────────────────────────────────────────────────────────────────

/// Stores kept in memory at once. Every store is persisted on each change,
/// so dropping the least recently used one loses nothing.
pub const MAX_OPEN_STORES: usize = 256;

#[derive(Debug)]
struct OpenStore {
    store: NotificationStore,
    last_used: u64,
}

#[derive(Debug, Default)]
struct OpenStores {
    tick: u64,
    entries: HashMap<String, OpenStore>,
}

impl OpenStores {
    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, open)| open.last_used)
            .map(|(email, _)| email.clone());
        if let Some(email) = oldest {
            self.entries.remove(&email);
            debug!(email = %email, "evicted idle notification store");
        }
    }
}

/// Owns the open per-user stores plus the reminder timer that feeds them.
pub struct NotificationHub {
    local: LocalStore,
    max_open: usize,
    stores: Mutex<OpenStores>,
    timer: StdMutex<Option<ReminderTimer>>,
}

impl NotificationHub {
    pub fn new(local: LocalStore) -> Arc<Self> {
        Self::with_capacity(local, MAX_OPEN_STORES)
    }

    pub fn with_capacity(local: LocalStore, max_open: usize) -> Arc<Self> {
        Arc::new(Self {
            local,
            max_open: max_open.max(1),
            stores: Mutex::new(OpenStores::default()),
            timer: StdMutex::new(None),
        })
    }

    /// Run `f` against the user's store, opening it from disk on first use.
    /// Opening past the cap drops the least recently used store.
    pub async fn with_store<R>(
        &self,
        email: &str,
        f: impl FnOnce(&mut NotificationStore) -> R,
    ) -> R {
        let mut stores = self.stores.lock().await;
        stores.tick += 1;
        let tick = stores.tick;
        if !stores.entries.contains_key(email) && stores.entries.len() >= self.max_open {
            stores.evict_least_recent();
        }
        let open = stores
            .entries
            .entry(email.to_string())
            .or_insert_with(|| OpenStore {
                store: NotificationStore::open(self.local.clone(), email),
                last_used: tick,
            });
        open.last_used = tick;
        f(&mut open.store)
    }

    /// Offer the 09:00 / 18:00 reminders to every open store. Returns how
    /// many notifications were actually added.
    pub async fn fire_reminders(&self, local_hour: u32, now: DateTime<Utc>) -> usize {
        let mut stores = self.stores.lock().await;
        let mut added = 0;
        for (email, OpenStore { store, .. }) in stores.entries.iter_mut() {
            let due = rules::time_of_day_reminders(email, store.settings(), local_hour, now);
            if due.is_empty() {
                continue;
            }
            match store.push_all(due) {
                Ok(n) => added += n,
                Err(e) => warn!(email = %email, error = %e, "failed to persist reminders"),
            }
        }
        added
    }

    /// Start (or restart) the periodic reminder check.
    pub fn start_reminders(self: &Arc<Self>, period: Duration) {
        let timer = ReminderTimer::spawn(Arc::downgrade(self), period);
        if let Ok(mut slot) = self.timer.lock() {
            if let Some(previous) = slot.replace(timer) {
                previous.stop();
            }
        }
        info!(period_secs = period.as_secs(), "reminder timer started");
    }

    pub fn stop_reminders(&self) {
        if let Ok(mut slot) = self.timer.lock() {
            if let Some(timer) = slot.take() {
                timer.stop();
            }
        }
    }

    pub fn reminders_running(&self) -> bool {
        self.timer
            .lock()
            .map(|slot| slot.as_ref().is_some_and(ReminderTimer::is_running))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn reminders_reach_open_stores_once_per_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hub = NotificationHub::new(LocalStore::new(dir.path()));
        hub.with_store("ana@x.org", |_| ()).await;
        hub.with_store("beto@x.org", |s| {
            let mut settings = *s.settings();
            settings.categories.reminders = false;
            s.update_settings(settings).expect("settings");
        })
        .await;

        assert_eq!(hub.fire_reminders(9, at(9)).await, 1);
        assert_eq!(hub.fire_reminders(9, at(9)).await, 0, "same slot twice");
        assert_eq!(hub.fire_reminders(12, at(12)).await, 0);
        assert_eq!(hub.fire_reminders(18, at(18)).await, 1);

        let count = hub.with_store("ana@x.org", |s| s.list().len()).await;
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn stores_reopen_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let hub = NotificationHub::new(LocalStore::new(dir.path()));
            hub.with_store("ana@x.org", |s| {
                s.push_all(vec![Notification::new(
                    NotificationKind::System,
                    Priority::Low,
                    "Hola",
                    "Bienvenida",
                    "ana@x.org",
                    at(10),
                )])
                .expect("push")
            })
            .await;
        }
        let hub = NotificationHub::new(LocalStore::new(dir.path()));
        let titles: Vec<String> = hub
            .with_store("ana@x.org", |s| s.list().iter().map(|n| n.title.clone()).collect())
            .await;
        assert_eq!(titles, vec!["Hola".to_string()]);
    }

    #[tokio::test]
    async fn idle_stores_are_evicted_past_the_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hub = NotificationHub::with_capacity(LocalStore::new(dir.path()), 2);
        let push_one = |s: &mut NotificationStore| {
            s.push_all(vec![Notification::new(
                NotificationKind::System,
                Priority::Low,
                "Hola",
                "Bienvenida",
                "ana@x.org",
                at(10),
            )])
            .expect("push")
        };

        hub.with_store("ana@x.org", push_one).await;
        hub.with_store("beto@x.org", |_| ()).await;
        hub.with_store("ana@x.org", |_| ()).await;
        hub.with_store("carla@x.org", |_| ()).await;
        assert_eq!(hub.stores.lock().await.entries.len(), 2);

        // beto was the least recently used, so reminders skip that store now.
        assert_eq!(hub.fire_reminders(9, at(9)).await, 2);

        // Evicted stores reopen from disk with their entries intact.
        let count = hub.with_store("ana@x.org", |s| s.list().len()).await;
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn timer_can_be_started_and_stopped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hub = NotificationHub::new(LocalStore::new(dir.path()));
        hub.start_reminders(Duration::from_secs(60));
        assert!(hub.reminders_running());
        hub.stop_reminders();
        assert!(!hub.reminders_running());
    }

    #[test]
    fn settings_fill_missing_fields() {
        let settings: NotificationSettings =
            serde_json::from_str(r#"{"categories": {"grades": false}}"#).unwrap();
        assert!(!settings.categories.grades);
        assert!(settings.categories.deadlines);
        assert!(settings.channels.email);
        assert!(!settings.channels.whatsapp);
    }
}
