//! Workspace tab model.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Lifecycle ────────────────────────────────────────────────────

/// Hook callbacks a tab's content can attach to its tab.
///
/// Every hook receives the tab it belongs to. All hooks default to no-ops
/// so implementors override only the transitions they care about.
pub trait TabLifecycle: Send + Sync {
    fn on_mount(&self, _tab: &WorkspaceTab) {}
    fn on_unmount(&self, _tab: &WorkspaceTab) {}
    fn on_activate(&self, _tab: &WorkspaceTab) {}
    fn on_deactivate(&self, _tab: &WorkspaceTab) {}
}

fn same_lifecycle(a: &Option<Arc<dyn TabLifecycle>>, b: &Option<Arc<dyn TabLifecycle>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

// ─── WorkspaceTab ─────────────────────────────────────────────────

/// One open unit of workspace content.
///
/// `title` and `icon` are the only fields the tab's own content may change
/// after creation (through [`TabStore::set_tab_meta`](crate::TabStore::set_tab_meta)).
#[derive(Clone, Serialize, Deserialize)]
pub struct WorkspaceTab {
    pub id: String,
    #[serde(rename = "type")]
    pub tab_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub closeable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(skip)]
    pub lifecycle: Option<Arc<dyn TabLifecycle>>,
}

impl PartialEq for WorkspaceTab {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.tab_type == other.tab_type
            && self.title == other.title
            && self.icon == other.icon
            && self.closeable == other.closeable
            && self.key == other.key
            && self.params == other.params
            && same_lifecycle(&self.lifecycle, &other.lifecycle)
    }
}

impl fmt::Debug for WorkspaceTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceTab")
            .field("id", &self.id)
            .field("tab_type", &self.tab_type)
            .field("title", &self.title)
            .field("icon", &self.icon)
            .field("closeable", &self.closeable)
            .field("key", &self.key)
            .field("params", &self.params)
            .field("lifecycle", &self.lifecycle.is_some())
            .finish()
    }
}

// ─── TabInput ─────────────────────────────────────────────────────

fn default_closeable() -> bool {
    true
}

/// Request to open a tab. The id is resolved by the store:
/// explicit `id`, else `{type}-{key}`, else a fresh random id.
#[derive(Clone, Serialize, Deserialize)]
pub struct TabInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tab_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default = "default_closeable")]
    pub closeable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(skip)]
    pub lifecycle: Option<Arc<dyn TabLifecycle>>,
}

impl TabInput {
    pub fn new(tab_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            tab_type: tab_type.into(),
            title: title.into(),
            icon: None,
            closeable: true,
            key: None,
            params: Value::Null,
            lifecycle: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn TabLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    #[must_use]
    pub fn pinned(mut self) -> Self {
        self.closeable = false;
        self
    }

    /// Resolve the id this input will occupy in the store.
    ///
    /// Key-derived ids are deterministic so re-opening the same key finds
    /// the existing tab instead of creating a duplicate.
    pub fn resolve_id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        if let Some(key) = &self.key {
            return format!("{}-{}", self.tab_type, key);
        }
        format!("{}-{}", self.tab_type, uuid::Uuid::new_v4().simple())
    }

    pub(crate) fn into_tab(self, id: String) -> WorkspaceTab {
        WorkspaceTab {
            id,
            tab_type: self.tab_type,
            title: self.title,
            icon: self.icon,
            closeable: self.closeable,
            key: self.key,
            params: self.params,
            lifecycle: self.lifecycle,
        }
    }
}

impl fmt::Debug for TabInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabInput")
            .field("id", &self.id)
            .field("tab_type", &self.tab_type)
            .field("title", &self.title)
            .field("closeable", &self.closeable)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// ─── TabMeta ──────────────────────────────────────────────────────

/// Self-service patch for a tab's chrome. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl TabMeta {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            icon: None,
        }
    }

    /// True if applying this patch to `tab` would change nothing.
    pub fn is_noop_for(&self, tab: &WorkspaceTab) -> bool {
        let title_same = self.title.as_ref().is_none_or(|t| *t == tab.title);
        let icon_same = self
            .icon
            .as_ref()
            .is_none_or(|i| tab.icon.as_deref() == Some(i.as_str()));
        title_same && icon_same
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl TabLifecycle for Noop {}

    #[test]
    fn explicit_id_wins_over_key() {
        let input = TabInput::new("terminal", "Shell").with_id("t1").with_key("main");
        assert_eq!(input.resolve_id(), "t1");
    }

    #[test]
    fn key_derives_deterministic_id() {
        let input = TabInput::new("task-detail", "Task 7").with_key("7");
        assert_eq!(input.resolve_id(), "task-detail-7");
        assert_eq!(input.resolve_id(), input.resolve_id());
    }

    #[test]
    fn random_ids_are_unique() {
        let input = TabInput::new("terminal", "Shell");
        assert_ne!(input.resolve_id(), input.resolve_id());
    }

    #[test]
    fn tab_input_deserializes_closeable_by_default() {
        let input: TabInput =
            serde_json::from_str(r#"{"type":"terminal","title":"Shell"}"#).expect("valid");
        assert!(input.closeable);
        assert_eq!(input.params, Value::Null);
    }

    #[test]
    fn equality_compares_lifecycle_by_identity() {
        let hooks: Arc<dyn TabLifecycle> = Arc::new(Noop);
        let a = TabInput::new("terminal", "a")
            .with_lifecycle(Arc::clone(&hooks))
            .into_tab("x".into());
        let b = a.clone();
        assert_eq!(a, b);

        let c = TabInput::new("terminal", "a")
            .with_lifecycle(Arc::new(Noop))
            .into_tab("x".into());
        assert_ne!(a, c);
    }

    #[test]
    fn meta_noop_detection() {
        let tab = TabInput::new("terminal", "Shell")
            .with_icon("terminal")
            .into_tab("t".into());
        assert!(TabMeta::default().is_noop_for(&tab));
        assert!(TabMeta::title("Shell").is_noop_for(&tab));
        assert!(!TabMeta::title("claude").is_noop_for(&tab));
        let icon = TabMeta {
            title: None,
            icon: Some("bot".into()),
        };
        assert!(!icon.is_noop_for(&tab));
    }
}
