//! Daemon wiring: PTY host, workspace host, UDS server, and the host event pump.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use deckhand_terminal::{HostEvent, PortablePtyHost};

use crate::config::Config;
use crate::preferences::PreferenceStore;
use crate::server;
use crate::tabs::builtin_registry;
use crate::workspace::WorkspaceHost;

/// Route PTY host events to their bridges until the channel closes or
/// `cancel` fires.
pub(crate) async fn pump_host_events(
    state: Arc<Mutex<WorkspaceHost>>,
    mut events: mpsc::UnboundedReceiver<HostEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => return,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            tracing::debug!("pty event channel closed");
            return;
        };
        state.lock().await.handle_host_event(event);
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!("cannot register SIGTERM handler: {e}");
                ctrl_c.await.ok();
                tracing::info!("received ctrl-c, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}

pub async fn run_daemon(config: Config, socket_path: &str) -> anyhow::Result<()> {
    let registry = builtin_registry()?;
    registry.check_conformance()?;

    let (pty, events) = PortablePtyHost::new();
    let preferences = PreferenceStore::new(&config.preferences_dir(), &config.preferences_key);
    tracing::info!(
        max_tabs = config.max_tabs,
        preferences = %preferences.path().display(),
        "workspace host starting"
    );
    let state = Arc::new(Mutex::new(WorkspaceHost::new(
        config,
        registry,
        Arc::new(pty),
        preferences,
    )));
    let cancel = CancellationToken::new();

    let server_state = Arc::clone(&state);
    let server_socket = socket_path.to_string();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state, server_cancel).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    let pump_handle = tokio::spawn(pump_host_events(
        Arc::clone(&state),
        events,
        cancel.clone(),
    ));

    tokio::select! {
        () = shutdown_signal() => {}
        _ = server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    cancel.cancel();
    state.lock().await.shutdown();
    let _ = pump_handle.await;

    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}
