//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "deckhand", about = "workspace tabs for agent terminal sessions")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/deckhand/deckhand.sock)
    #[arg(long, short = 's', global = true, env = "DECKHAND_SOCKET")]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the workspace host and UDS server
    Daemon,
    /// List open tabs
    Tabs,
    /// Open a terminal tab
    OpenTerminal(OpenTerminalOpts),
    /// Rename a tab
    Rename { tab_id: String, title: String },
    /// Close a tab
    Close { tab_id: String },
    /// Open a terminal and wait until its output pipeline renders
    Probe(ProbeOpts),
}

#[derive(clap::Args)]
pub struct OpenTerminalOpts {
    /// Agent profile to launch (default: saved preference, else the shell)
    #[arg(long)]
    pub agent: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub title: Option<String>,
}

#[derive(clap::Args)]
pub struct ProbeOpts {
    #[arg(long, default_value = "10")]
    pub timeout_secs: u64,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/deckhand/deckhand.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/deckhand-{user}/deckhand.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rename_with_global_socket() {
        let cli = Cli::try_parse_from(["deckhand", "rename", "t1", "build logs", "-s", "/tmp/x.sock"])
            .expect("parse");
        assert_eq!(cli.socket_path.as_deref(), Some("/tmp/x.sock"));
        assert!(matches!(cli.command, Command::Rename { ref tab_id, ref title } if tab_id == "t1" && title == "build logs"));
    }

    #[test]
    fn probe_timeout_defaults() {
        let cli = Cli::try_parse_from(["deckhand", "probe"]).expect("parse");
        assert!(matches!(cli.command, Command::Probe(ProbeOpts { timeout_secs: 10 })));
    }
}
