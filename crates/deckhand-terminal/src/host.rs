//! PTY host seam: the external process host that owns real OS processes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::HostError;

/// Concrete command line for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub cols: u16,
    pub rows: u16,
}

/// Pushed by the host, correlated by session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Output { session_id: String, data: Vec<u8> },
    Closed { session_id: String, exit_code: Option<i32> },
    Error { session_id: String, message: String },
}

impl HostEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Output { session_id, .. }
            | Self::Closed { session_id, .. }
            | Self::Error { session_id, .. } => session_id,
        }
    }
}

/// Operations consumed from the process host. Output, exit, and error
/// notifications arrive separately as [`HostEvent`]s.
pub trait PtyHost: Send + Sync {
    fn spawn(&self, session_id: &str, spec: &LaunchSpec) -> Result<(), HostError>;
    fn write(&self, session_id: &str, data: &[u8]) -> Result<(), HostError>;
    fn resize(&self, session_id: &str, cols: u16, rows: u16) -> Result<(), HostError>;
    fn close(&self, session_id: &str) -> Result<(), HostError>;
}

impl<T: PtyHost + ?Sized> PtyHost for Arc<T> {
    fn spawn(&self, session_id: &str, spec: &LaunchSpec) -> Result<(), HostError> {
        (**self).spawn(session_id, spec)
    }
    fn write(&self, session_id: &str, data: &[u8]) -> Result<(), HostError> {
        (**self).write(session_id, data)
    }
    fn resize(&self, session_id: &str, cols: u16, rows: u16) -> Result<(), HostError> {
        (**self).resize(session_id, cols, rows)
    }
    fn close(&self, session_id: &str) -> Result<(), HostError> {
        (**self).close(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_exposes_session_id() {
        let ev = HostEvent::Closed {
            session_id: "s1".into(),
            exit_code: Some(0),
        };
        assert_eq!(ev.session_id(), "s1");
    }
}
