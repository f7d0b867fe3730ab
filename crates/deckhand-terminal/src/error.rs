//! Error types for PTY hosts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown terminal session: {0}")]
    UnknownSession(String),

    #[error("terminal session already exists: {0}")]
    SessionExists(String),

    #[error("failed to spawn session {session_id}: {detail}")]
    Spawn { session_id: String, detail: String },

    #[error("pty io error: {0}")]
    Io(#[from] std::io::Error),
}
