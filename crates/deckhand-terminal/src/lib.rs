//! deckhand-terminal: terminal session bridge between a tab and a remote PTY.
//!
//! Bytes flow `PtyHost` → [`TerminalBridge`] → [`TerminalEmulator`], with
//! [`diagnostics`] counters recorded at each hop so liveness can be
//! asserted from outside.

pub mod ansi;
pub mod bridge;
pub mod diagnostics;
pub mod emulator;
pub mod error;
pub mod host;
pub mod pty;
pub mod session;

pub use bridge::{BridgeSnapshot, SessionStatus, TerminalBridge};
pub use diagnostics::{TerminalDiagnostics, is_pipeline_ready};
pub use emulator::{HeadlessEmulator, TerminalEmulator};
pub use error::HostError;
pub use host::{HostEvent, LaunchSpec, PtyHost};
pub use pty::PortablePtyHost;
pub use session::{
    HumanSession, TERMINAL_TAB_TYPE, TerminalLaunchParams, TerminalSessionConfig, TerminalTabModule,
};
