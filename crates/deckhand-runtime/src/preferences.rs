//! Persisted launch preferences: a flat JSON record per storage key.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use deckhand_terminal::TerminalLaunchParams;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchPreferences {
    pub agent: Option<String>,
    pub model: Option<String>,
    pub effort: Option<String>,
    pub thinking: Option<bool>,
    pub permission_level: Option<String>,
}

impl LaunchPreferences {
    /// Fill launch fields the caller left unset.
    pub fn fill(&self, launch: &mut TerminalLaunchParams) {
        if launch.agent.is_none() {
            launch.agent.clone_from(&self.agent);
        }
        if launch.model.is_none() {
            launch.model.clone_from(&self.model);
        }
        if launch.effort.is_none() {
            launch.effort.clone_from(&self.effort);
        }
        if launch.thinking.is_none() {
            launch.thinking = self.thinking;
        }
    }
}

/// File-backed store at `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(dir: &Path, key: &str) -> Self {
        Self {
            path: dir.join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load(&self) -> LaunchPreferences {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LaunchPreferences::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read launch preferences");
                return LaunchPreferences::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "corrupt launch preferences, using defaults");
            LaunchPreferences::default()
        })
    }

    pub fn save(&self, prefs: &LaunchPreferences) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LaunchPreferences {
        LaunchPreferences {
            agent: Some("claude".into()),
            model: Some("opus".into()),
            effort: None,
            thinking: Some(true),
            permission_level: Some("ask".into()),
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PreferenceStore::new(dir.path(), "nope");
        assert_eq!(store.load(), LaunchPreferences::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PreferenceStore::new(&dir.path().join("nested"), "work");
        store.save(&sample()).expect("save");
        assert!(store.path().ends_with("work.json"));
        assert_eq!(store.load(), sample());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PreferenceStore::new(dir.path(), "bad");
        std::fs::write(store.path(), "{not json").expect("write");
        assert_eq!(store.load(), LaunchPreferences::default());
    }

    #[test]
    fn unknown_and_missing_fields_are_tolerated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PreferenceStore::new(dir.path(), "partial");
        std::fs::write(store.path(), r#"{"agent":"codex","theme":"dark"}"#).expect("write");
        let prefs = store.load();
        assert_eq!(prefs.agent.as_deref(), Some("codex"));
        assert!(prefs.model.is_none());
    }

    #[test]
    fn fill_keeps_explicit_fields() {
        let mut launch = TerminalLaunchParams {
            model: Some("sonnet".into()),
            ..Default::default()
        };
        sample().fill(&mut launch);
        assert_eq!(launch.agent.as_deref(), Some("claude"));
        assert_eq!(launch.model.as_deref(), Some("sonnet"));
        assert_eq!(launch.thinking, Some(true));
    }
}
