//! `deckhand probe`: prove bytes flow from a real PTY to a visible render.

use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::client::rpc_call;

const PROBE_INPUT: &str = "printf 'deckhand probe: pipeline ok\\n'\r";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbeStep {
    /// Launch still in flight.
    Launching,
    /// Session is up but nothing has been typed into it yet.
    SendInput,
    /// Waiting for output to render.
    Waiting,
    Ready,
    Failed(String),
}

/// Decide the next step from `terminal_status` and `diagnostics` results.
pub(crate) fn next_step(status: &Value, diagnostics: &Value, input_sent: bool) -> ProbeStep {
    if diagnostics["pipeline_ready"].as_bool() == Some(true) {
        return ProbeStep::Ready;
    }
    match status["status"]["state"].as_str() {
        Some("running") if !input_sent => ProbeStep::SendInput,
        Some("running") => ProbeStep::Waiting,
        Some("failed") => ProbeStep::Failed(
            status["status"]["message"]
                .as_str()
                .unwrap_or("launch failed")
                .to_string(),
        ),
        Some("exited") if input_sent => ProbeStep::Waiting,
        Some("exited") => ProbeStep::Failed("session exited before input".to_string()),
        _ => ProbeStep::Launching,
    }
}

/// Entry point for `deckhand probe`.
///
/// Returns an exit code:
/// - 0: pipeline ready
/// - 1: timeout
/// - 2: daemon unreachable or launch failed
pub async fn cmd_probe(socket_path: &str, timeout_secs: u64) -> i32 {
    let opened = match rpc_call(
        socket_path,
        "open_tab",
        json!({"type": "terminal", "title": "probe", "params": {}}),
    )
    .await
    {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Cannot open probe terminal: {e:#}");
            return 2;
        }
    };
    let Some(tab_id) = opened["id"].as_str().map(str::to_string) else {
        eprintln!("Daemon returned no tab id");
        return 2;
    };

    let code = run_probe(socket_path, &tab_id, Duration::from_secs(timeout_secs)).await;
    if let Err(e) = rpc_call(socket_path, "close_tab", json!({ "id": tab_id })).await {
        tracing::debug!(tab_id, error = %e, "failed to close probe tab");
    }
    code
}

async fn run_probe(socket_path: &str, tab_id: &str, timeout: Duration) -> i32 {
    let start = Instant::now();
    let terminal = json!({ "tab_id": tab_id });
    if let Err(e) = rpc_call(socket_path, "terminal_ready", terminal.clone()).await {
        eprintln!("Cannot mark probe terminal ready: {e:#}");
        return 2;
    }

    let mut input_sent = false;
    loop {
        let status = match rpc_call(socket_path, "terminal_status", terminal.clone()).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Lost probe terminal: {e:#}");
                return 2;
            }
        };
        let session = json!({ "session_id": status["session_id"] });
        let diagnostics = rpc_call(socket_path, "diagnostics", session)
            .await
            .unwrap_or(Value::Null);

        match next_step(&status, &diagnostics, input_sent) {
            ProbeStep::Ready => {
                eprintln!("Pipeline ready. ({}ms)", start.elapsed().as_millis());
                return 0;
            }
            ProbeStep::Failed(message) => {
                eprintln!("Probe failed: {message}");
                return 2;
            }
            ProbeStep::SendInput => {
                let write = json!({ "tab_id": tab_id, "data": PROBE_INPUT });
                match rpc_call(socket_path, "terminal_write", write).await {
                    Ok(_) => input_sent = true,
                    Err(e) => tracing::debug!(tab_id, error = %e, "probe input rejected, retrying"),
                }
            }
            ProbeStep::Launching | ProbeStep::Waiting => {}
        }

        if start.elapsed() >= timeout {
            eprintln!("Timeout after {}s", timeout.as_secs());
            return 1;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: &str) -> Value {
        json!({"session_id": "s1", "status": {"state": state}})
    }

    #[test]
    fn ready_wins_over_status() {
        let diag = json!({"pipeline_ready": true});
        assert_eq!(next_step(&status("exited"), &diag, true), ProbeStep::Ready);
    }

    #[test]
    fn running_session_gets_input_once() {
        let diag = json!({"pipeline_ready": false});
        assert_eq!(next_step(&status("running"), &diag, false), ProbeStep::SendInput);
        assert_eq!(next_step(&status("running"), &diag, true), ProbeStep::Waiting);
        assert_eq!(next_step(&status("launching"), &Value::Null, false), ProbeStep::Launching);
    }

    #[test]
    fn failed_launch_reports_message() {
        let failed = json!({"status": {"state": "failed", "message": "no such file"}});
        assert_eq!(
            next_step(&failed, &Value::Null, false),
            ProbeStep::Failed("no such file".into())
        );
        assert!(matches!(
            next_step(&status("exited"), &Value::Null, false),
            ProbeStep::Failed(_)
        ));
    }
}
