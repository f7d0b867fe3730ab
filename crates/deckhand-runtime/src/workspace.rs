//! Workspace host: the tab store, the lifecycle kernel, and one terminal
//! bridge per mounted terminal tab.
//!
//! Every store mutation goes through [`WorkspaceHost::apply`], which diffs
//! kernel snapshots around the mutation and runs the resulting lifecycle
//! events. Terminal tabs get their remote session on `onMount` and lose it
//! on `onUnmount`, so keep-alive decides how long a PTY lives.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use deckhand_kernel::{
    Generation, LifecycleEvent, LifecycleHook, RegistryError, TabInput, TabMeta, TabStore,
    TabTypeRegistry, WorkspaceKernelSnapshot, WorkspaceTab, build_workspace_kernel_snapshot,
    compute_workspace_lifecycle_events, dispatch_lifecycle_events,
};
use deckhand_terminal::{
    BridgeSnapshot, HeadlessEmulator, HostError, HostEvent, LaunchSpec, PtyHost,
    TERMINAL_TAB_TYPE, TerminalBridge, TerminalLaunchParams, TerminalSessionConfig,
};

use crate::config::Config;
use crate::preferences::{LaunchPreferences, PreferenceStore};

const ICON_RUNNING: &str = "terminal";
const ICON_EXITED: &str = "terminal-exited";
const ICON_FAILED: &str = "terminal-error";

/// A spawn request issued on mount, waiting to be run against the PTY host.
#[derive(Debug, Clone)]
pub struct PendingLaunch {
    pub tab_id: String,
    pub session_id: String,
    pub ticket: Generation,
    pub spec: LaunchSpec,
}

pub struct WorkspaceHost {
    store: TabStore,
    registry: TabTypeRegistry,
    config: Config,
    pty: Arc<dyn PtyHost>,
    /// Tab id → bridge.
    bridges: HashMap<String, TerminalBridge<HeadlessEmulator>>,
    /// Session id → tab id.
    sessions: HashMap<String, String>,
    pending: Vec<PendingLaunch>,
    preference_store: PreferenceStore,
    preferences: LaunchPreferences,
}

impl WorkspaceHost {
    pub fn new(
        config: Config,
        registry: TabTypeRegistry,
        pty: Arc<dyn PtyHost>,
        preference_store: PreferenceStore,
    ) -> Self {
        let preferences = preference_store.load();
        Self {
            store: TabStore::new(config.max_tabs),
            registry,
            config,
            pty,
            bridges: HashMap::new(),
            sessions: HashMap::new(),
            pending: Vec::new(),
            preference_store,
            preferences,
        }
    }

    pub fn store(&self) -> &TabStore {
        &self.store
    }

    pub fn pty(&self) -> Arc<dyn PtyHost> {
        Arc::clone(&self.pty)
    }

    fn keeps_alive(&self, tab_type: &str) -> bool {
        match &self.config.keep_alive_types {
            Some(types) => types.iter().any(|t| t == tab_type),
            None => self.registry.keep_alive(tab_type),
        }
    }

    pub fn kernel_snapshot(&self) -> WorkspaceKernelSnapshot {
        let state = self.store.snapshot();
        build_workspace_kernel_snapshot(&state.tabs, &state.active_tab_id, |t| self.keeps_alive(t))
    }

    // ─── Store mutations ──────────────────────────────────────────

    /// Run a store mutation and the lifecycle transitions it causes.
    pub fn apply<R>(&mut self, mutate: impl FnOnce(&TabStore) -> R) -> R {
        let before = self.kernel_snapshot();
        let out = mutate(&self.store);
        let after = self.kernel_snapshot();

        let events = compute_workspace_lifecycle_events(&before, &after);
        dispatch_lifecycle_events(&events);
        for event in &events {
            self.on_lifecycle(event);
        }
        out
    }

    /// Validate and open a tab. Terminal tabs inherit unset launch fields
    /// from the saved preferences.
    pub fn open_tab(&mut self, input: TabInput) -> Result<String, RegistryError> {
        let input = self.prepare(input)?;
        Ok(self.apply(|store| store.open_tab(input)))
    }

    pub fn open_tab_after(&mut self, after_tab_id: &str, input: TabInput) -> Result<String, RegistryError> {
        let input = self.prepare(input)?;
        Ok(self.apply(|store| store.open_tab_after(after_tab_id, input)))
    }

    fn prepare(&self, mut input: TabInput) -> Result<TabInput, RegistryError> {
        if input.tab_type == TERMINAL_TAB_TYPE {
            let mut launch = TerminalLaunchParams::from_params(&input.params).map_err(|e| {
                RegistryError::InvalidParams {
                    tab_type: TERMINAL_TAB_TYPE.to_string(),
                    detail: e.to_string(),
                }
            })?;
            self.preferences.fill(&mut launch);
            input.params = serde_json::to_value(&launch).map_err(|e| RegistryError::InvalidParams {
                tab_type: TERMINAL_TAB_TYPE.to_string(),
                detail: e.to_string(),
            })?;
        }
        self.registry.prepare(input)
    }

    // ─── Lifecycle ────────────────────────────────────────────────

    fn on_lifecycle(&mut self, event: &LifecycleEvent) {
        if event.tab.tab_type != TERMINAL_TAB_TYPE {
            return;
        }
        let tab_id = event.tab.id.as_str();
        match event.hook {
            LifecycleHook::OnMount => self.mount_terminal(&event.tab),
            LifecycleHook::OnUnmount => self.unmount_terminal(tab_id),
            LifecycleHook::OnActivate | LifecycleHook::OnDeactivate => {
                if let Some(bridge) = self.bridges.get_mut(tab_id) {
                    bridge.set_active(event.hook == LifecycleHook::OnActivate);
                }
            }
        }
    }

    fn mount_terminal(&mut self, tab: &WorkspaceTab) {
        if self.bridges.contains_key(&tab.id) {
            debug!(tab_id = %tab.id, "terminal already mounted");
            return;
        }
        let launch = TerminalLaunchParams::from_params(&tab.params).unwrap_or_else(|e| {
            warn!(tab_id = %tab.id, error = %e, "bad terminal params, launching a shell");
            TerminalLaunchParams::default()
        });
        let session = TerminalSessionConfig::new(launch);
        let (cols, rows) = (self.config.terminal.cols, self.config.terminal.rows);
        let spec = self.config.launch_spec(&session.launch, cols, rows);
        let session_id = session.session_id.clone();

        let mut bridge = TerminalBridge::new(
            tab.id.clone(),
            session,
            Arc::clone(&self.pty),
            HeadlessEmulator::new(cols, rows, self.config.terminal.scrollback),
            cols,
            rows,
        );
        let ticket = bridge.begin_launch();
        info!(tab_id = %tab.id, session_id = %session_id, program = %spec.program, "launching terminal session");

        self.sessions.insert(session_id.clone(), tab.id.clone());
        self.bridges.insert(tab.id.clone(), bridge);
        self.pending.push(PendingLaunch {
            tab_id: tab.id.clone(),
            session_id,
            ticket,
            spec,
        });
    }

    fn unmount_terminal(&mut self, tab_id: &str) {
        let Some(mut bridge) = self.bridges.remove(tab_id) else {
            return;
        };
        bridge.close();
        self.sessions.remove(bridge.session_id());
        self.pending.retain(|p| p.tab_id != tab_id);
        info!(tab_id, session_id = %bridge.session_id(), "terminal session closed");
    }

    // ─── Launches ─────────────────────────────────────────────────

    pub fn take_pending_launches(&mut self) -> Vec<PendingLaunch> {
        std::mem::take(&mut self.pending)
    }

    /// Apply a spawn result. Results for sessions that are gone or have been
    /// superseded are dropped, and a successful stale spawn is torn down.
    pub fn complete_launch(&mut self, launch: &PendingLaunch, result: Result<(), HostError>) {
        let succeeded = result.is_ok();
        let applied = match self.bridges.get_mut(&launch.tab_id) {
            Some(bridge) if bridge.session_id() == launch.session_id => {
                bridge.complete_launch(launch.ticket, result.map_err(|e| e.to_string()))
            }
            _ => false,
        };

        if !applied {
            debug!(session_id = %launch.session_id, "discarding launch result for defunct session");
            if succeeded {
                if let Err(e) = self.pty.close(&launch.session_id) {
                    debug!(session_id = %launch.session_id, error = %e, "closing orphaned session");
                }
            }
            return;
        }
        let icon = if succeeded { ICON_RUNNING } else { ICON_FAILED };
        self.set_icon(&launch.tab_id, icon);
    }

    /// Run queued launches inline against the PTY host.
    pub fn run_pending_launches(&mut self) {
        for launch in self.take_pending_launches() {
            let result = self.pty.spawn(&launch.session_id, &launch.spec);
            self.complete_launch(&launch, result);
        }
    }

    fn set_icon(&mut self, tab_id: &str, icon: &str) {
        let meta = TabMeta {
            title: None,
            icon: Some(icon.to_string()),
        };
        self.apply(|store| store.set_tab_meta(tab_id, meta));
    }

    // ─── Host events ──────────────────────────────────────────────

    pub fn handle_host_event(&mut self, event: HostEvent) {
        let Some(tab_id) = self.sessions.get(event.session_id()).cloned() else {
            debug!(session_id = %event.session_id(), "event for unknown session dropped");
            return;
        };
        let Some(bridge) = self.bridges.get_mut(&tab_id) else {
            return;
        };
        match event {
            HostEvent::Output { data, .. } => {
                bridge.on_output(&data);
                bridge.render();
            }
            HostEvent::Closed { exit_code, .. } => {
                bridge.on_closed(exit_code);
                self.set_icon(&tab_id, ICON_EXITED);
            }
            HostEvent::Error { message, .. } => bridge.on_error(message),
        }
    }

    // ─── Terminal operations ──────────────────────────────────────

    fn bridge_mut(&mut self, tab_id: &str) -> anyhow::Result<&mut TerminalBridge<HeadlessEmulator>> {
        self.bridges
            .get_mut(tab_id)
            .with_context(|| format!("no mounted terminal for tab {tab_id}"))
    }

    pub fn bridge(&self, tab_id: &str) -> Option<&TerminalBridge<HeadlessEmulator>> {
        self.bridges.get(tab_id)
    }

    pub fn terminal_write(&mut self, tab_id: &str, data: &[u8]) -> anyhow::Result<()> {
        self.bridge_mut(tab_id)?.send_input(data)?;
        Ok(())
    }

    pub fn terminal_resize(&mut self, tab_id: &str, cols: u16, rows: u16) -> anyhow::Result<bool> {
        let bridge = self.bridge_mut(tab_id)?;
        let sent = bridge.resize(cols, rows)?;
        if sent {
            bridge.render();
        }
        Ok(sent)
    }

    pub fn terminal_ready(&mut self, tab_id: &str) -> anyhow::Result<()> {
        let bridge = self.bridge_mut(tab_id)?;
        bridge.mark_ready();
        bridge.render();
        Ok(())
    }

    pub fn terminal_status(&self, tab_id: &str) -> anyhow::Result<BridgeSnapshot> {
        self.bridge(tab_id)
            .map(TerminalBridge::snapshot)
            .with_context(|| format!("no mounted terminal for tab {tab_id}"))
    }

    pub fn dismiss_alert(&mut self, tab_id: &str, index: usize) -> anyhow::Result<Option<String>> {
        Ok(self.bridge_mut(tab_id)?.dismiss_alert(index))
    }

    // ─── Preferences ──────────────────────────────────────────────

    pub fn launch_preferences(&self) -> &LaunchPreferences {
        &self.preferences
    }

    pub fn set_launch_preferences(&mut self, prefs: LaunchPreferences) -> anyhow::Result<()> {
        if prefs == self.preferences {
            return Ok(());
        }
        self.preference_store.save(&prefs)?;
        self.preferences = prefs;
        Ok(())
    }

    /// Tear down every live session, e.g. on daemon shutdown.
    pub fn shutdown(&mut self) {
        self.apply(TabStore::close_all);
        let remaining: Vec<String> = self.bridges.keys().cloned().collect();
        for tab_id in remaining {
            self.unmount_terminal(&tab_id);
        }
    }
}

/// Run queued launches on the blocking pool and apply each result.
pub async fn drive_launches(host: Arc<Mutex<WorkspaceHost>>) {
    let (pty, launches) = {
        let mut guard = host.lock().await;
        (guard.pty(), guard.take_pending_launches())
    };
    for launch in launches {
        let pty = Arc::clone(&pty);
        let host = Arc::clone(&host);
        tokio::spawn(async move {
            let session_id = launch.session_id.clone();
            let spec = launch.spec.clone();
            let result = tokio::task::spawn_blocking(move || pty.spawn(&session_id, &spec))
                .await
                .unwrap_or_else(|e| {
                    Err(HostError::Spawn {
                        session_id: launch.session_id.clone(),
                        detail: e.to_string(),
                    })
                });
            host.lock().await.complete_launch(&launch, result);
        });
    }
}
