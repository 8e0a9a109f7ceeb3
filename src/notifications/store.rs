use anyhow::Result;
use std::collections::VecDeque;

use super::{Notification, NotificationSettings};
use crate::local_store::LocalStore;

/// Most recent entries kept per user.
pub const CAPACITY: usize = 50;

/// Dedupe keys remembered per user, well past what the list itself holds.
pub const SEEN_KEYS_CAPACITY: usize = 1000;

fn list_key(email: &str) -> String {
    format!("notifications-{email}")
}

fn settings_key(email: &str) -> String {
    format!("notification-settings-{email}")
}

fn seen_keys_key(email: &str) -> String {
    format!("notification-keys-{email}")
}

/// One user's notifications, newest first, persisted on every change.
///
/// Dedupe keys live in their own ring, oldest first, so a removed or
/// evicted entry is not generated again by the next refresh.
#[derive(Debug)]
pub struct NotificationStore {
    local: LocalStore,
    email: String,
    items: Vec<Notification>,
    seen_keys: VecDeque<String>,
    settings: NotificationSettings,
}

impl NotificationStore {
    pub fn open(local: LocalStore, email: &str) -> Self {
        let mut items: Vec<Notification> = local.load(&list_key(email)).unwrap_or_default();
        items.truncate(CAPACITY);
        let settings = local.load(&settings_key(email)).unwrap_or_default();
        let seen_keys = local
            .load::<VecDeque<String>>(&seen_keys_key(email))
            .unwrap_or_else(|| {
                // Lists written before the ring existed carry their keys inline.
                items
                    .iter()
                    .rev()
                    .filter_map(|n| n.dedupe_key.clone())
                    .collect()
            });
        let mut store = Self {
            local,
            email: email.to_string(),
            items,
            seen_keys,
            settings,
        };
        store.trim_seen_keys();
        store
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn list(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: NotificationSettings) -> Result<()> {
        self.local.save(&settings_key(&self.email), &settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Add notifications at the front with a single write. Entries whose
    /// dedupe key is already held are skipped. Returns how many were new.
    pub fn push_all(&mut self, notifications: Vec<Notification>) -> Result<usize> {
        let added = notifications
            .into_iter()
            .filter(|n| self.insert(n.clone()))
            .count();
        if added > 0 {
            self.save()?;
            self.save_seen_keys()?;
        }
        Ok(added)
    }

    pub fn mark_read(&mut self, id: &str) -> Result<bool> {
        let Some(item) = self.items.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        if !item.read {
            item.read = true;
            self.save()?;
        }
        Ok(true)
    }

    pub fn mark_all_read(&mut self) -> Result<usize> {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|n| !n.read) {
            item.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.save()?;
        }
        Ok(changed)
    }

    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Empty the visible list. Seen keys survive so cleared entries stay gone.
    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.local.remove(&list_key(&self.email))
    }

    fn insert(&mut self, notification: Notification) -> bool {
        if let Some(key) = notification.dedupe_key.as_deref() {
            if self.seen_keys.iter().any(|k| k == key) {
                return false;
            }
            self.seen_keys.push_back(key.to_string());
            self.trim_seen_keys();
        }
        self.items.insert(0, notification);
        self.items.truncate(CAPACITY);
        true
    }

    fn trim_seen_keys(&mut self) {
        while self.seen_keys.len() > SEEN_KEYS_CAPACITY {
            self.seen_keys.pop_front();
        }
    }

    fn save(&self) -> Result<()> {
        self.local.save(&list_key(&self.email), &self.items)
    }

    fn save_seen_keys(&self) -> Result<()> {
        self.local.save(&seen_keys_key(&self.email), &self.seen_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{NotificationKind, Priority};
    use chrono::{Duration, TimeZone, Utc};

    fn note(i: i64) -> Notification {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap() + Duration::minutes(i);
        Notification::new(
            NotificationKind::System,
            Priority::Low,
            format!("#{i}"),
            "msg",
            "ana@x.org",
            at,
        )
    }

    fn open(dir: &tempfile::TempDir) -> NotificationStore {
        NotificationStore::open(LocalStore::new(dir.path()), "ana@x.org")
    }

    #[test]
    fn fifty_first_entry_evicts_the_oldest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open(&dir);
        for i in 1..=50 {
            store.push_all(vec![note(i)]).expect("push");
        }
        assert_eq!(store.list().len(), 50);

        store.push_all(vec![note(51)]).expect("push");
        let titles: Vec<&str> = store.list().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles.len(), 50);
        assert_eq!(titles[0], "#51");
        assert_eq!(titles[49], "#2");
        assert!(!titles.contains(&"#1"));
    }

    #[test]
    fn dedupe_key_blocks_repeats() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open(&dir);
        let mut first = note(1);
        first.dedupe_key = Some("deadline:c:w:2026-10-01".into());
        let mut again = note(2);
        again.dedupe_key = first.dedupe_key.clone();

        assert_eq!(store.push_all(vec![first]).expect("push"), 1);
        assert_eq!(store.push_all(vec![again]).expect("push"), 0);
        assert_eq!(store.push_all(vec![note(3)]).expect("push"), 1, "no key, always added");
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn read_state_and_removal_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open(&dir);
        store.push_all(vec![note(1), note(2), note(3)]).expect("push_all");
        let first_id = store.list()[2].id.clone();
        let last_id = store.list()[0].id.clone();

        assert!(store.mark_read(&first_id).expect("mark"));
        assert!(!store.mark_read("missing").expect("mark"));
        assert_eq!(store.unread_count(), 2);
        assert!(store.remove(&last_id).expect("remove"));

        let reopened = open(&dir);
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.unread_count(), 1);

        let mut reopened = reopened;
        assert_eq!(reopened.mark_all_read().expect("all"), 1);
        reopened.clear().expect("clear");
        assert!(open(&dir).list().is_empty());
    }

    fn keyed(i: i64) -> Notification {
        let mut n = note(i);
        n.dedupe_key = Some(format!("deadline:c:w{i}:2026-10-01"));
        n
    }

    #[test]
    fn removed_entry_is_not_generated_again() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open(&dir);
        assert_eq!(store.push_all(vec![keyed(1)]).expect("push"), 1);
        let id = store.list()[0].id.clone();
        assert!(store.remove(&id).expect("remove"));

        assert_eq!(store.push_all(vec![keyed(1)]).expect("push"), 0);
        assert!(store.list().is_empty());

        // Survives a reopen and a clear.
        let mut reopened = open(&dir);
        reopened.clear().expect("clear");
        assert_eq!(reopened.push_all(vec![keyed(1)]).expect("push"), 0);
    }

    #[test]
    fn batch_larger_than_capacity_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open(&dir);
        let batch = || (1..=60).map(keyed).collect::<Vec<_>>();

        assert_eq!(store.push_all(batch()).expect("push"), 60);
        assert_eq!(store.list().len(), CAPACITY);
        let before: Vec<String> = store.list().iter().map(|n| n.id.clone()).collect();

        assert_eq!(store.push_all(batch()).expect("push"), 0);
        let after: Vec<String> = store.list().iter().map(|n| n.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn seen_keys_are_bounded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open(&dir);
        let total = SEEN_KEYS_CAPACITY as i64 + 5;
        store
            .push_all((1..=total).map(keyed).collect())
            .expect("push");

        let reopened = open(&dir);
        assert_eq!(reopened.seen_keys.len(), SEEN_KEYS_CAPACITY);
        // The oldest keys fell out of the ring.
        let mut store = reopened;
        assert_eq!(store.push_all(vec![keyed(1)]).expect("push"), 1);
        assert_eq!(store.push_all(vec![keyed(total)]).expect("push"), 0);
    }

    #[test]
    fn stores_are_per_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ana = open(&dir);
        ana.push_all(vec![note(1)]).expect("push");
        let beto = NotificationStore::open(LocalStore::new(dir.path()), "beto@x.org");
        assert!(beto.list().is_empty());
        assert_eq!(beto.email(), "beto@x.org");
    }
}
