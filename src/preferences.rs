use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::local_store::LocalStore;

const KEY: &str = "preferences";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Which dashboard the user sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coordinator,
    Teacher,
    #[default]
    Student,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub role: Role,
    pub language: Language,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub role: Option<Role>,
    pub language: Option<Language>,
}

/// Owns the persisted preferences: read once when opened, written back on
/// every change.
#[derive(Debug)]
pub struct PreferencesStore {
    store: LocalStore,
    current: Preferences,
}

impl PreferencesStore {
    pub fn open(store: LocalStore) -> Self {
        let current = store.load(KEY).unwrap_or_default();
        Self { store, current }
    }

    pub fn get(&self) -> Preferences {
        self.current
    }

    pub fn update(&mut self, patch: PreferencesPatch) -> Result<Preferences> {
        let mut next = self.current;
        if let Some(theme) = patch.theme {
            next.theme = theme;
        }
        if let Some(role) = patch.role {
            next.role = role;
        }
        if let Some(language) = patch.language {
            next.language = language;
        }
        self.store.save(KEY, &next)?;
        self.current = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = PreferencesStore::open(LocalStore::new(dir.path()));
        assert_eq!(prefs.get(), Preferences::default());
        assert_eq!(prefs.get().language, Language::Es);
    }

    #[test]
    fn updates_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut prefs = PreferencesStore::open(LocalStore::new(dir.path()));
        prefs
            .update(PreferencesPatch {
                theme: Some(Theme::Dark),
                role: Some(Role::Coordinator),
                language: None,
            })
            .expect("update");

        let reopened = PreferencesStore::open(LocalStore::new(dir.path()));
        assert_eq!(
            reopened.get(),
            Preferences {
                theme: Theme::Dark,
                role: Role::Coordinator,
                language: Language::Es,
            }
        );
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"role":"teacher"}"#).unwrap();
        assert_eq!(prefs.role, Role::Teacher);
        assert_eq!(prefs.theme, Theme::System);
    }
}
