//! Process-wide terminal pipeline counters, keyed by session id.
//!
//! Only append/increment operations are exposed. Each session owns its own
//! counters, so one lock around the map is the only synchronization.
//! [`is_pipeline_ready`] is what test automation polls to prove bytes
//! flowed from the host through the emulator to a visible render.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::ansi::strip_ansi;
use crate::emulator::TerminalEmulator;

const PREVIEW_CHARS: usize = 240;
const MAX_LINE_PREVIEWS: usize = 6;
const MIN_PIPELINE_BYTES: u64 = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TerminalDiagnostics {
    pub bridge_chunks: u64,
    pub bridge_bytes: u64,
    pub bridge_printable_bytes: u64,
    pub write_calls: u64,
    pub write_bytes: u64,
    pub ready_marks: u64,
    pub render_events: u64,
    pub non_empty_render_events: u64,
    pub max_visible_non_empty_lines: usize,
    pub raw_preview: String,
    pub plain_preview: String,
    pub visible_line_previews: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TerminalDiagnostics {
    /// Bytes arrived, bytes were written, and something non-blank was
    /// painted. Every condition is required.
    pub fn is_pipeline_ready(&self) -> bool {
        self.bridge_chunks >= 1
            && self.bridge_bytes >= MIN_PIPELINE_BYTES
            && self.write_calls >= 1
            && self.write_bytes >= MIN_PIPELINE_BYTES
            && self.render_events >= 1
            && self.non_empty_render_events >= 1
            && self.max_visible_non_empty_lines >= 1
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

static DIAGNOSTICS: LazyLock<Mutex<HashMap<String, TerminalDiagnostics>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn with_session<R>(session_id: &str, f: impl FnOnce(&mut TerminalDiagnostics) -> R) -> R {
    let mut map = DIAGNOSTICS.lock();
    let entry = map.entry(session_id.to_string()).or_default();
    let out = f(entry);
    entry.touch();
    out
}

/// Keep the trailing `PREVIEW_CHARS` characters of `existing + chunk`.
fn append_preview(existing: &mut String, chunk: &str) {
    existing.push_str(chunk);
    let count = existing.chars().count();
    if count > PREVIEW_CHARS {
        *existing = existing.chars().skip(count - PREVIEW_CHARS).collect();
    }
}

// ─── Recording ────────────────────────────────────────────────────

/// One output chunk received from the host.
pub fn record_terminal_bridge_output(session_id: &str, data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    let plain = strip_ansi(&text);
    let printable = plain
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .map(char::len_utf8)
        .sum::<usize>() as u64;
    with_session(session_id, |d| {
        d.bridge_chunks += 1;
        d.bridge_bytes += data.len() as u64;
        d.bridge_printable_bytes += printable;
        append_preview(&mut d.raw_preview, &text);
        append_preview(&mut d.plain_preview, &plain);
    });
}

/// Bytes actually handed to the emulator.
pub fn record_terminal_write(session_id: &str, data: &[u8]) {
    with_session(session_id, |d| {
        d.write_calls += 1;
        d.write_bytes += data.len() as u64;
    });
}

pub fn record_terminal_ready(session_id: &str) {
    with_session(session_id, |d| d.ready_marks += 1);
}

/// One paint tick. Scans the visible viewport, bounded by the smaller of the
/// emulator's row count and its buffer length.
pub fn record_terminal_render<E: TerminalEmulator + ?Sized>(session_id: &str, emulator: &E) {
    let lines = emulator.buffer_lines();
    let visible = emulator.rows().min(lines.len());
    let non_empty: Vec<String> = lines[..visible]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    with_session(session_id, |d| {
        d.render_events += 1;
        if non_empty.is_empty() {
            return;
        }
        d.non_empty_render_events += 1;
        d.max_visible_non_empty_lines = d.max_visible_non_empty_lines.max(non_empty.len());
        d.visible_line_previews = non_empty.into_iter().take(MAX_LINE_PREVIEWS).collect();
    });
}

// ─── Queries ──────────────────────────────────────────────────────

pub fn diagnostics_for(session_id: &str) -> Option<TerminalDiagnostics> {
    DIAGNOSTICS.lock().get(session_id).cloned()
}

pub fn all_diagnostics() -> HashMap<String, TerminalDiagnostics> {
    DIAGNOSTICS.lock().clone()
}

pub fn is_pipeline_ready(session_id: &str) -> bool {
    DIAGNOSTICS
        .lock()
        .get(session_id)
        .is_some_and(TerminalDiagnostics::is_pipeline_ready)
}

/// Drop all recorded sessions.
pub fn reset_for_testing() {
    DIAGNOSTICS.lock().clear();
}

/// Serializes tests that touch the process-wide map.
#[cfg(test)]
pub(crate) fn test_lock() -> parking_lot::MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = parking_lot::const_mutex(());
    LOCK.lock()
}
