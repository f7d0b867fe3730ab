//! Workspace kernel: mount plans and lifecycle diffing.
//!
//! Pure functions with no rendering or IO dependencies. Given two
//! snapshots, [`compute_workspace_lifecycle_events`] yields the exact hook
//! sequence that moves the workspace from one to the other:
//!
//! 1. `onDeactivate` for the previously active tab (if the active id changed)
//! 2. `onUnmount` for tabs leaving the mounted set, in previous order
//! 3. `onMount` for tabs entering the mounted set, in next order
//! 4. `onActivate` for the newly active tab (if the active id changed)

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tab::WorkspaceTab;

// ─── Mount plan ───────────────────────────────────────────────────

/// Tabs whose content must be instantiated right now.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceMountPlan<'a> {
    pub active_tab: Option<&'a WorkspaceTab>,
    /// Inactive tabs kept mounted by the keep-alive predicate, in collection order.
    pub inactive_keep_alive_tabs: Vec<&'a WorkspaceTab>,
}

pub fn build_workspace_mount_plan<'a, F>(
    tabs: &'a [WorkspaceTab],
    active_tab_id: &str,
    keep_alive_on_deactivate: F,
) -> WorkspaceMountPlan<'a>
where
    F: Fn(&str) -> bool,
{
    let active_tab = tabs.iter().find(|t| t.id == active_tab_id);
    let inactive_keep_alive_tabs = tabs
        .iter()
        .filter(|t| t.id != active_tab_id && keep_alive_on_deactivate(&t.tab_type))
        .collect();
    WorkspaceMountPlan {
        active_tab,
        inactive_keep_alive_tabs,
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────

/// Derived view of the workspace used as the before/after state of a diff.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceKernelSnapshot {
    pub tabs: Vec<WorkspaceTab>,
    /// Tab id → index into `tabs`.
    pub tabs_by_id: HashMap<String, usize>,
    pub active_tab_id: String,
    pub mounted_tab_ids: HashSet<String>,
}

impl WorkspaceKernelSnapshot {
    pub fn tab(&self, tab_id: &str) -> Option<&WorkspaceTab> {
        self.tabs_by_id.get(tab_id).map(|&idx| &self.tabs[idx])
    }

    pub fn is_mounted(&self, tab_id: &str) -> bool {
        self.mounted_tab_ids.contains(tab_id)
    }
}

pub fn build_workspace_kernel_snapshot<F>(
    tabs: &[WorkspaceTab],
    active_tab_id: &str,
    keep_alive_on_deactivate: F,
) -> WorkspaceKernelSnapshot
where
    F: Fn(&str) -> bool,
{
    let plan = build_workspace_mount_plan(tabs, active_tab_id, keep_alive_on_deactivate);
    let mounted_tab_ids = plan
        .active_tab
        .into_iter()
        .chain(plan.inactive_keep_alive_tabs)
        .map(|t| t.id.clone())
        .collect();
    let tabs_by_id = tabs
        .iter()
        .enumerate()
        .map(|(idx, t)| (t.id.clone(), idx))
        .collect();

    WorkspaceKernelSnapshot {
        tabs: tabs.to_vec(),
        tabs_by_id,
        active_tab_id: active_tab_id.to_string(),
        mounted_tab_ids,
    }
}

// ─── Lifecycle events ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleHook {
    #[serde(rename = "onMount")]
    OnMount,
    #[serde(rename = "onUnmount")]
    OnUnmount,
    #[serde(rename = "onActivate")]
    OnActivate,
    #[serde(rename = "onDeactivate")]
    OnDeactivate,
}

impl LifecycleHook {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnMount => "onMount",
            Self::OnUnmount => "onUnmount",
            Self::OnActivate => "onActivate",
            Self::OnDeactivate => "onDeactivate",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub hook: LifecycleHook,
    pub tab: WorkspaceTab,
}

impl LifecycleEvent {
    fn new(hook: LifecycleHook, tab: &WorkspaceTab) -> Self {
        Self {
            hook,
            tab: tab.clone(),
        }
    }
}

/// Compute the ordered hook sequence from `previous` to `next`.
///
/// A missing tab on either side of an active-id change simply omits the
/// corresponding deactivate/activate event.
pub fn compute_workspace_lifecycle_events(
    previous: &WorkspaceKernelSnapshot,
    next: &WorkspaceKernelSnapshot,
) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    let active_changed = previous.active_tab_id != next.active_tab_id;

    if active_changed {
        if let Some(tab) = previous.tab(&previous.active_tab_id) {
            events.push(LifecycleEvent::new(LifecycleHook::OnDeactivate, tab));
        }
    }

    events.extend(
        previous
            .tabs
            .iter()
            .filter(|t| previous.is_mounted(&t.id) && !next.is_mounted(&t.id))
            .map(|t| LifecycleEvent::new(LifecycleHook::OnUnmount, t)),
    );

    events.extend(
        next.tabs
            .iter()
            .filter(|t| next.is_mounted(&t.id) && !previous.is_mounted(&t.id))
            .map(|t| LifecycleEvent::new(LifecycleHook::OnMount, t)),
    );

    if active_changed {
        if let Some(tab) = next.tab(&next.active_tab_id) {
            events.push(LifecycleEvent::new(LifecycleHook::OnActivate, tab));
        }
    }

    events
}

/// Invoke each event's hook on the tab's attached lifecycle, in order.
pub fn dispatch_lifecycle_events(events: &[LifecycleEvent]) {
    for event in events {
        tracing::debug!(tab_id = %event.tab.id, hook = %event.hook, "lifecycle");
        let Some(lifecycle) = &event.tab.lifecycle else {
            continue;
        };
        match event.hook {
            LifecycleHook::OnMount => lifecycle.on_mount(&event.tab),
            LifecycleHook::OnUnmount => lifecycle.on_unmount(&event.tab),
            LifecycleHook::OnActivate => lifecycle.on_activate(&event.tab),
            LifecycleHook::OnDeactivate => lifecycle.on_deactivate(&event.tab),
        }
    }
}
