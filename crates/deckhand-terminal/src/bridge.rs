//! Terminal session bridge: binds one terminal tab to one remote PTY session.
//!
//! Output is buffered until the tab content calls [`TerminalBridge::mark_ready`],
//! then flushed in arrival order. Failures stay on the bridge as a status or
//! alert and never reach the tab store.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use deckhand_kernel::{Generation, GenerationCounter};

use crate::diagnostics;
use crate::emulator::TerminalEmulator;
use crate::error::HostError;
use crate::host::PtyHost;
use crate::session::TerminalSessionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Launching,
    Running,
    Exited { exit_code: Option<i32> },
    Failed { message: String },
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Serializable view of a bridge for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeSnapshot {
    pub tab_id: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub ready: bool,
    pub active: bool,
    pub pending_chunks: usize,
    pub alerts: Vec<String>,
    pub cols: u16,
    pub rows: u16,
}

pub struct TerminalBridge<E> {
    tab_id: String,
    config: TerminalSessionConfig,
    host: Arc<dyn PtyHost>,
    emulator: E,
    status: SessionStatus,
    launches: GenerationCounter,
    ready: bool,
    active: bool,
    pending: VecDeque<Vec<u8>>,
    alerts: Vec<String>,
    size: (u16, u16),
    launched_size: Option<(u16, u16)>,
}

impl<E: TerminalEmulator> TerminalBridge<E> {
    pub fn new(
        tab_id: impl Into<String>,
        config: TerminalSessionConfig,
        host: Arc<dyn PtyHost>,
        emulator: E,
        cols: u16,
        rows: u16,
    ) -> Self {
        Self {
            tab_id: tab_id.into(),
            config,
            host,
            emulator,
            status: SessionStatus::Launching,
            launches: GenerationCounter::new(),
            ready: false,
            active: false,
            pending: VecDeque::new(),
            alerts: Vec::new(),
            size: (cols, rows),
            launched_size: None,
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn config(&self) -> &TerminalSessionConfig {
        &self.config
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn emulator(&self) -> &E {
        &self.emulator
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            tab_id: self.tab_id.clone(),
            session_id: self.config.session_id.clone(),
            status: self.status.clone(),
            ready: self.ready,
            active: self.active,
            pending_chunks: self.pending.len(),
            alerts: self.alerts.clone(),
            cols: self.size.0,
            rows: self.size.1,
        }
    }

    // ─── Launch ───────────────────────────────────────────────────

    /// Issue the ticket for a spawn request at the current size.
    pub fn begin_launch(&mut self) -> Generation {
        self.status = SessionStatus::Launching;
        self.launched_size = Some(self.size);
        self.launches.issue()
    }

    /// Apply a spawn result. Returns `false` if the ticket is stale, in which
    /// case nothing changes and the caller owns cleanup of the remote side.
    pub fn complete_launch(&mut self, ticket: Generation, result: Result<(), String>) -> bool {
        if !self.launches.is_current(ticket) {
            debug!(
                session_id = %self.config.session_id,
                ticket = ticket.value(),
                "discarding stale launch result"
            );
            return false;
        }
        match result {
            Ok(()) => {
                self.status = SessionStatus::Running;
                // Catch up on resizes that landed while the spawn was in flight.
                if self.launched_size != Some(self.size) {
                    let (cols, rows) = self.size;
                    if let Err(e) = self.host.resize(&self.config.session_id, cols, rows) {
                        self.on_error(e.to_string());
                    }
                }
                self.launched_size = Some(self.size);
            }
            Err(message) => {
                warn!(session_id = %self.config.session_id, error = %message, "terminal launch failed");
                self.status = SessionStatus::Failed { message };
            }
        }
        true
    }

    // ─── Host → emulator ──────────────────────────────────────────

    pub fn on_output(&mut self, data: &[u8]) {
        diagnostics::record_terminal_bridge_output(&self.config.session_id, data);
        if self.ready {
            self.write_to_emulator(data);
        } else {
            self.pending.push_back(data.to_vec());
        }
    }

    /// The emulator can receive writes. Buffered output is flushed in order.
    pub fn mark_ready(&mut self) {
        diagnostics::record_terminal_ready(&self.config.session_id);
        if self.ready {
            return;
        }
        self.ready = true;
        while let Some(chunk) = self.pending.pop_front() {
            self.write_to_emulator(&chunk);
        }
    }

    fn write_to_emulator(&mut self, data: &[u8]) {
        self.emulator.write(data);
        diagnostics::record_terminal_write(&self.config.session_id, data);
    }

    /// One paint tick.
    pub fn render(&self) {
        diagnostics::record_terminal_render(&self.config.session_id, &self.emulator);
    }

    pub fn on_closed(&mut self, exit_code: Option<i32>) {
        debug!(session_id = %self.config.session_id, ?exit_code, "terminal session ended");
        self.launches.invalidate();
        self.status = SessionStatus::Exited { exit_code };
    }

    /// Record a mid-session error as a dismissible alert on this tab.
    pub fn on_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(session_id = %self.config.session_id, tab_id = %self.tab_id, error = %message, "terminal session error");
        self.alerts.push(message);
    }

    pub fn dismiss_alert(&mut self, index: usize) -> Option<String> {
        (index < self.alerts.len()).then(|| self.alerts.remove(index))
    }

    // ─── Emulator → host ──────────────────────────────────────────

    /// Forward keystrokes verbatim. A host write failure on a running
    /// session is also raised as a tab alert.
    pub fn send_input(&mut self, data: &[u8]) -> Result<(), HostError> {
        if !self.status.is_running() {
            return Err(HostError::UnknownSession(self.config.session_id.clone()));
        }
        if let Err(e) = self.host.write(&self.config.session_id, data) {
            self.on_error(format!("input not delivered: {e}"));
            return Err(e);
        }
        Ok(())
    }

    /// Resize the emulator and the remote PTY. Returns `false` when the size
    /// is unchanged and nothing was sent.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<bool, HostError> {
        if self.size == (cols, rows) {
            debug!(session_id = %self.config.session_id, cols, rows, "suppressing redundant resize");
            return Ok(false);
        }
        self.size = (cols, rows);
        self.emulator.resize(cols, rows);
        if self.status.is_running() {
            self.host.resize(&self.config.session_id, cols, rows)?;
            self.launched_size = Some(self.size);
        }
        Ok(true)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Tear down the remote session. Late launch results become stale.
    pub fn close(&mut self) {
        self.launches.invalidate();
        if self.status.is_running() {
            if let Err(e) = self.host.close(&self.config.session_id) {
                debug!(session_id = %self.config.session_id, error = %e, "close on finished session");
            }
            self.status = SessionStatus::Exited { exit_code: None };
        }
    }
}
