//! Reactive tab store: canonical tab order and active tab id.
//!
//! Every mutation runs through [`watch::Sender::send_if_modified`]. An
//! operation that leaves the state semantically unchanged reports "not
//! modified", so subscribers see no notification.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::tab::{TabInput, TabMeta, WorkspaceTab};

/// Default cap on open tabs. Exceeding it evicts the oldest closeable tab.
pub const DEFAULT_MAX_TABS: usize = 12;

// ─── TabState ─────────────────────────────────────────────────────

/// Observable state of the store.
///
/// `active_tab_id` is either empty (no tabs) or the id of a tab in `tabs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabState {
    pub tabs: Vec<WorkspaceTab>,
    pub active_tab_id: String,
}

impl TabState {
    pub fn index_of(&self, tab_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    pub fn get(&self, tab_id: &str) -> Option<&WorkspaceTab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.index_of(tab_id).is_some()
    }

    pub fn active_tab(&self) -> Option<&WorkspaceTab> {
        self.get(&self.active_tab_id)
    }

    /// Replace tabs and active id, reporting whether anything changed.
    fn replace(&mut self, tabs: Vec<WorkspaceTab>, active_tab_id: String) -> bool {
        if self.tabs == tabs && self.active_tab_id == active_tab_id {
            return false;
        }
        self.tabs = tabs;
        self.active_tab_id = active_tab_id;
        true
    }
}

/// Remove the leftmost closeable tabs (never `protected_id`) until the
/// collection fits the cap. Returns the evicted ids in eviction order.
///
/// If only non-closeable tabs remain, the cap is left exceeded.
fn evict_overflow(tabs: &mut Vec<WorkspaceTab>, max_tabs: usize, protected_id: &str) -> Vec<String> {
    let mut evicted = Vec::new();
    while tabs.len() > max_tabs {
        let Some(idx) = tabs.iter().position(|t| t.closeable && t.id != protected_id) else {
            break;
        };
        evicted.push(tabs.remove(idx).id);
    }
    evicted
}

// ─── TabStore ─────────────────────────────────────────────────────

/// Single source of truth for open tabs.
pub struct TabStore {
    state: watch::Sender<TabState>,
    max_tabs: usize,
}

impl Default for TabStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TABS)
    }
}

impl TabStore {
    /// Create an empty store. A cap of zero is treated as one.
    pub fn new(max_tabs: usize) -> Self {
        let (state, _) = watch::channel(TabState::default());
        Self {
            state,
            max_tabs: max_tabs.max(1),
        }
    }

    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<TabState> {
        self.state.subscribe()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> TabState {
        self.state.borrow().clone()
    }

    pub fn active_tab_id(&self) -> String {
        self.state.borrow().active_tab_id.clone()
    }

    pub fn tab(&self, tab_id: &str) -> Option<WorkspaceTab> {
        self.state.borrow().get(tab_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open a tab at the end of the strip, or activate it if its resolved id
    /// is already open. Returns the resolved id.
    pub fn open_tab(&self, input: TabInput) -> String {
        self.insert(None, input)
    }

    /// Like [`open_tab`](Self::open_tab) but inserts right after
    /// `after_tab_id`. Falls back to appending if that tab is not open.
    pub fn open_tab_after(&self, after_tab_id: &str, input: TabInput) -> String {
        self.insert(Some(after_tab_id), input)
    }

    fn insert(&self, after_tab_id: Option<&str>, input: TabInput) -> String {
        let id = input.resolve_id();
        let max_tabs = self.max_tabs;
        let mut evicted = Vec::new();

        self.state.send_if_modified(|state| {
            if state.contains(&id) {
                if state.active_tab_id == id {
                    return false;
                }
                state.active_tab_id = id.clone();
                return true;
            }

            let index = after_tab_id
                .and_then(|after| state.index_of(after))
                .map_or(state.tabs.len(), |idx| idx + 1);
            state.tabs.insert(index, input.into_tab(id.clone()));
            evicted = evict_overflow(&mut state.tabs, max_tabs, &id);
            state.active_tab_id = id.clone();
            true
        });

        for evicted_id in &evicted {
            tracing::info!(tab_id = %evicted_id, max_tabs, "evicted tab over cap");
        }
        id
    }

    /// Close a closeable tab. If it was active, the tab before it becomes
    /// active, else the tab after it, else none.
    pub fn close_tab(&self, tab_id: &str) {
        self.state.send_if_modified(|state| {
            let Some(idx) = state.index_of(tab_id) else {
                return false;
            };
            if !state.tabs[idx].closeable {
                return false;
            }
            state.tabs.remove(idx);
            if state.active_tab_id == tab_id {
                let next = if idx > 0 {
                    state.tabs.get(idx - 1)
                } else {
                    state.tabs.get(idx)
                };
                state.active_tab_id = next.map(|t| t.id.clone()).unwrap_or_default();
            }
            true
        });
    }

    pub fn switch_tab(&self, tab_id: &str) {
        self.state.send_if_modified(|state| {
            if state.active_tab_id == tab_id || !state.contains(tab_id) {
                return false;
            }
            state.active_tab_id = tab_id.to_string();
            true
        });
    }

    /// Keep `tab_id` and every non-closeable tab; close everything else.
    pub fn close_all_except(&self, tab_id: &str) {
        self.state.send_if_modified(|state| {
            let tabs: Vec<WorkspaceTab> = state
                .tabs
                .iter()
                .filter(|t| t.id == tab_id || !t.closeable)
                .cloned()
                .collect();
            let active = if tabs.iter().any(|t| t.id == tab_id) {
                tab_id.to_string()
            } else if tabs.iter().any(|t| t.id == state.active_tab_id) {
                state.active_tab_id.clone()
            } else {
                tabs.first().map(|t| t.id.clone()).unwrap_or_default()
            };
            state.replace(tabs, active)
        });
    }

    /// Close every closeable tab; the first survivor becomes active.
    pub fn close_all(&self) {
        self.state.send_if_modified(|state| {
            let tabs: Vec<WorkspaceTab> =
                state.tabs.iter().filter(|t| !t.closeable).cloned().collect();
            let active = tabs.first().map(|t| t.id.clone()).unwrap_or_default();
            state.replace(tabs, active)
        });
    }

    /// Close closeable tabs to the right of `tab_id`. The active tab is kept
    /// if it survives; otherwise `tab_id` becomes active.
    pub fn close_to_right(&self, tab_id: &str) {
        self.state.send_if_modified(|state| {
            let Some(idx) = state.index_of(tab_id) else {
                return false;
            };
            let tabs: Vec<WorkspaceTab> = state
                .tabs
                .iter()
                .enumerate()
                .filter(|(i, t)| *i <= idx || !t.closeable)
                .map(|(_, t)| t.clone())
                .collect();
            let active = if tabs.iter().any(|t| t.id == state.active_tab_id) {
                state.active_tab_id.clone()
            } else {
                tab_id.to_string()
            };
            state.replace(tabs, active)
        });
    }

    /// Move the tab at `from_index` to `to_index`.
    pub fn reorder_tabs(&self, from_index: usize, to_index: usize) {
        self.state.send_if_modified(|state| {
            let len = state.tabs.len();
            if from_index == to_index || from_index >= len || to_index >= len {
                return false;
            }
            let tab = state.tabs.remove(from_index);
            state.tabs.insert(to_index, tab);
            true
        });
    }

    /// Patch a tab's title and/or icon.
    pub fn set_tab_meta(&self, tab_id: &str, meta: TabMeta) {
        self.state.send_if_modified(|state| {
            let Some(tab) = state.tabs.iter_mut().find(|t| t.id == tab_id) else {
                return false;
            };
            if meta.is_noop_for(tab) {
                return false;
            }
            if let Some(title) = meta.title {
                tab.title = title;
            }
            if let Some(icon) = meta.icon {
                tab.icon = Some(icon);
            }
            true
        });
    }
}
