//! deckhand: workspace tab host for agent terminal sessions.
//! One daemon owns the tab store and every PTY session; CLI subcommands
//! talk to it over a UDS JSON-RPC socket.

use clap::Parser;

mod cli;
mod client;
mod cmd_probe;
mod cmd_tabs;
mod config;
mod daemon;
mod preferences;
mod server;
mod tabs;
mod workspace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon => {
            let filter = std::env::var("DECKHAND_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("deckhand daemon starting");

            let config = config::Config::load()?;
            daemon::run_daemon(config, &socket_path).await?;
        }
        cli::Command::Tabs => {
            cmd_tabs::cmd_tabs(&socket_path).await?;
        }
        cli::Command::OpenTerminal(opts) => {
            cmd_tabs::cmd_open_terminal(&socket_path, &opts).await?;
        }
        cli::Command::Rename { tab_id, title } => {
            cmd_tabs::cmd_rename(&socket_path, &tab_id, &title).await?;
        }
        cli::Command::Close { tab_id } => {
            cmd_tabs::cmd_close(&socket_path, &tab_id).await?;
        }
        cli::Command::Probe(opts) => {
            let exit_code = cmd_probe::cmd_probe(&socket_path, opts.timeout_secs).await;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
