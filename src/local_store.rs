use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// Small JSON key/value store on disk, one file per key. Plays the part
/// browser local storage plays for the dashboard: theme, role, language and
/// per-user notification state.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

// ─── Path ────────────────────────────────────────────────────────────────────

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("semillero"))
}

/// Keys embed user emails; keep only filename-safe characters.
fn file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.json")
}

// ─── I/O ─────────────────────────────────────────────────────────────────────

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key))
    }

    /// Missing or unreadable entries load as `None`; a corrupt file is
    /// logged and ignored so the caller falls back to defaults.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable local state");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key);
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path().join("nested"));
        store.save("theme", &"dark").expect("save");
        assert_eq!(store.load::<String>("theme").as_deref(), Some("dark"));
        store.remove("theme").expect("remove");
        assert_eq!(store.load::<String>("theme"), None);
    }

    #[test]
    fn corrupt_entry_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path());
        std::fs::write(dir.path().join("prefs.json"), "{not json").expect("write");
        assert_eq!(store.load::<serde_json::Value>("prefs"), None);
    }

    #[test]
    fn keys_are_sanitized() {
        assert_eq!(
            file_name("notifications-Ana.Perez@Example.org"),
            "notifications-ana.perez@example.org.json"
        );
        assert_eq!(file_name("../etc/passwd"), ".._etc_passwd.json");
    }
}
