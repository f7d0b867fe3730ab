//! `PtyHost` backed by `portable-pty`.
//!
//! Each session gets one blocking reader thread and one writer thread. Chunks
//! go out on the event channel in read order, and the reader reaps the child
//! after EOF so `Closed` always follows the session's last `Output`. Input is
//! queued to the writer thread, so a process that stops reading stdin only
//! stalls its own session.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::HostError;
use crate::host::{HostEvent, LaunchSpec, PtyHost};

const READ_BUFFER: usize = 8192;

#[cfg(unix)]
const EIO: i32 = 5;

struct PtySession {
    input: mpsc::UnboundedSender<Vec<u8>>,
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
}

#[derive(Clone)]
pub struct PortablePtyHost {
    sessions: Arc<Mutex<HashMap<String, PtySession>>>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl std::fmt::Debug for PortablePtyHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortablePtyHost")
            .field("sessions", &self.sessions.lock().len())
            .finish()
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn spawn_error(session_id: &str, e: impl std::fmt::Display) -> HostError {
    HostError::Spawn {
        session_id: session_id.to_string(),
        detail: e.to_string(),
    }
}

/// The other side of the PTY went away. This ends the session normally.
fn is_hangup(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
    ) {
        return true;
    }
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(EIO)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Forward output chunks until EOF or a read failure. Returns `false` once
/// nobody is listening for events.
fn read_loop(
    session_id: &str,
    mut reader: impl Read,
    events: &mpsc::UnboundedSender<HostEvent>,
) -> bool {
    let mut buf = [0u8; READ_BUFFER];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return true,
            Ok(n) => {
                let event = HostEvent::Output {
                    session_id: session_id.to_string(),
                    data: buf[..n].to_vec(),
                };
                if events.send(event).is_err() {
                    return false;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_hangup(&e) => {
                debug!(session_id, error = %e, "pty reader finished");
                return true;
            }
            Err(e) => {
                warn!(session_id, error = %e, "pty read failed");
                return events
                    .send(HostEvent::Error {
                        session_id: session_id.to_string(),
                        message: format!("pty read failed: {e}"),
                    })
                    .is_ok();
            }
        }
    }
}

/// Drain queued input into the PTY until the queue closes or a write fails.
fn write_loop(
    session_id: &str,
    mut writer: impl Write,
    mut input: mpsc::UnboundedReceiver<Vec<u8>>,
    events: &mpsc::UnboundedSender<HostEvent>,
) {
    while let Some(data) = input.blocking_recv() {
        let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) else {
            continue;
        };
        if is_hangup(&e) {
            debug!(session_id, error = %e, "pty writer finished");
        } else {
            warn!(session_id, error = %e, "pty write failed");
            let _ = events.send(HostEvent::Error {
                session_id: session_id.to_string(),
                message: format!("pty write failed: {e}"),
            });
        }
        return;
    }
}

impl PortablePtyHost {
    /// Returns the host and the receiver for its session events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            events,
        };
        (host, rx)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn spawn_reader(&self, session_id: String, reader: Box<dyn Read + Send>) {
        let sessions = Arc::clone(&self.sessions);
        let events = self.events.clone();

        std::thread::spawn(move || {
            if !read_loop(&session_id, reader, &events) {
                return;
            }

            // An explicit close already removed the session.
            let Some(mut session) = sessions.lock().remove(&session_id) else {
                return;
            };
            let exit_code = match session.child.wait() {
                Ok(status) => Some(status.exit_code() as i32),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "failed to reap pty child");
                    None
                }
            };
            let _ = events.send(HostEvent::Closed {
                session_id,
                exit_code,
            });
        });
    }

    fn spawn_writer(
        &self,
        session_id: String,
        writer: Box<dyn Write + Send>,
        input: mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let events = self.events.clone();
        std::thread::spawn(move || write_loop(&session_id, writer, input, &events));
    }
}

impl PtyHost for PortablePtyHost {
    fn spawn(&self, session_id: &str, spec: &LaunchSpec) -> Result<(), HostError> {
        if self.sessions.lock().contains_key(session_id) {
            return Err(HostError::SessionExists(session_id.to_string()));
        }

        let pair = native_pty_system()
            .openpty(pty_size(spec.cols, spec.rows))
            .map_err(|e| spawn_error(session_id, e))?;

        let mut cmd = CommandBuilder::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.cwd(cwd);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| spawn_error(session_id, e))?;
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_error(session_id, e))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_error(session_id, e))?;

        let (input, input_rx) = mpsc::unbounded_channel();
        self.sessions.lock().insert(
            session_id.to_string(),
            PtySession {
                input,
                master: pair.master,
                child,
            },
        );
        self.spawn_writer(session_id.to_string(), writer, input_rx);
        self.spawn_reader(session_id.to_string(), reader);
        debug!(session_id, program = %spec.program, "pty spawned");
        Ok(())
    }

    fn write(&self, session_id: &str, data: &[u8]) -> Result<(), HostError> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| HostError::UnknownSession(session_id.to_string()))?;
        session
            .input
            .send(data.to_vec())
            .map_err(|_| HostError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pty writer stopped")))
    }

    fn resize(&self, session_id: &str, cols: u16, rows: u16) -> Result<(), HostError> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| HostError::UnknownSession(session_id.to_string()))?;
        session
            .master
            .resize(pty_size(cols, rows))
            .map_err(|e| HostError::Io(io::Error::other(e.to_string())))
    }

    fn close(&self, session_id: &str) -> Result<(), HostError> {
        let mut session = self
            .sessions
            .lock()
            .remove(session_id)
            .ok_or_else(|| HostError::UnknownSession(session_id.to_string()))?;
        if let Err(e) = session.child.kill() {
            debug!(session_id, error = %e, "failed to kill pty child");
        }
        Ok(())
    }
}
