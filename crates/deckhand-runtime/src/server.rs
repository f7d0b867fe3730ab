//! UDS JSON-RPC server: connection-per-request, newline-delimited JSON.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use deckhand_kernel::{TabInput, TabMeta};
use deckhand_terminal::diagnostics;

use crate::preferences::LaunchPreferences;
use crate::workspace::{WorkspaceHost, drive_launches};

pub(crate) const METHOD_NOT_FOUND: i64 = -32601;
pub(crate) const HANDLER_ERROR: i64 = -32000;

/// Run the UDS JSON-RPC server until `cancel` fires.
pub async fn run_server(
    socket_path: &str,
    state: Arc<Mutex<WorkspaceHost>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => accepted?,
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    state: Arc<Mutex<WorkspaceHost>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let outcome = {
        let mut host = state.lock().await;
        dispatch(&mut host, method, &request["params"])
    };
    drive_launches(Arc::clone(&state)).await;

    let response = match outcome {
        Some(Ok(result)) => json!({"jsonrpc": "2.0", "result": result, "id": id}),
        Some(Err(e)) => {
            tracing::debug!(method, error = %e, "handler error");
            json!({
                "jsonrpc": "2.0",
                "error": {"code": HANDLER_ERROR, "message": format!("{e:#}")},
                "id": id,
            })
        }
        None => json!({
            "jsonrpc": "2.0",
            "error": {"code": METHOD_NOT_FOUND, "message": "method not found"},
            "id": id,
        }),
    };
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

// ─── Params ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TabIdParams {
    id: String,
}

#[derive(Deserialize)]
struct OpenAfterParams {
    after_id: String,
    tab: TabInput,
}

#[derive(Deserialize)]
struct ReorderParams {
    from: usize,
    to: usize,
}

#[derive(Deserialize)]
struct MetaParams {
    id: String,
    #[serde(flatten)]
    meta: TabMeta,
}

#[derive(Deserialize)]
struct WriteParams {
    tab_id: String,
    data: String,
}

#[derive(Deserialize)]
struct ResizeParams {
    tab_id: String,
    cols: u16,
    rows: u16,
}

#[derive(Deserialize)]
struct TerminalParams {
    tab_id: String,
}

#[derive(Deserialize)]
struct DismissParams {
    tab_id: String,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize, Default)]
struct DiagnosticsParams {
    #[serde(default)]
    session_id: Option<String>,
}

fn parse<T: serde::de::DeserializeOwned>(params: &Value) -> anyhow::Result<T> {
    let params = if params.is_null() { json!({}) } else { params.clone() };
    Ok(serde_json::from_value(params)?)
}

// ─── Dispatch ─────────────────────────────────────────────────────

/// Route one request. `None` means the method does not exist.
pub(crate) fn dispatch(
    host: &mut WorkspaceHost,
    method: &str,
    params: &Value,
) -> Option<anyhow::Result<Value>> {
    let result = match method {
        "list_tabs" => Ok(build_tab_list(host)),
        "open_tab" => parse::<TabInput>(params)
            .and_then(|input| Ok(host.open_tab(input)?))
            .map(|id| json!({ "id": id })),
        "open_tab_after" => parse::<OpenAfterParams>(params)
            .and_then(|p| Ok(host.open_tab_after(&p.after_id, p.tab)?))
            .map(|id| json!({ "id": id })),
        "close_tab" => tab_op(host, params, |store, id| store.close_tab(id)),
        "switch_tab" => tab_op(host, params, |store, id| store.switch_tab(id)),
        "close_all_except" => tab_op(host, params, |store, id| store.close_all_except(id)),
        "close_to_right" => tab_op(host, params, |store, id| store.close_to_right(id)),
        "close_all" => {
            host.apply(|store| store.close_all());
            Ok(build_tab_list(host))
        }
        "reorder_tabs" => parse::<ReorderParams>(params).map(|p| {
            host.apply(|store| store.reorder_tabs(p.from, p.to));
            build_tab_list(host)
        }),
        "set_tab_meta" => parse::<MetaParams>(params).and_then(|p| {
            host.apply(|store| store.set_tab_meta(&p.id, p.meta));
            let tab = host
                .store()
                .tab(&p.id)
                .ok_or_else(|| anyhow::anyhow!("tab not found: {}", p.id))?;
            Ok(tab_json(&tab, &host.store().active_tab_id()))
        }),
        "terminal_write" => parse::<WriteParams>(params)
            .and_then(|p| host.terminal_write(&p.tab_id, p.data.as_bytes()))
            .map(|()| json!({ "ok": true })),
        "terminal_resize" => parse::<ResizeParams>(params)
            .and_then(|p| host.terminal_resize(&p.tab_id, p.cols, p.rows))
            .map(|sent| json!({ "sent": sent })),
        "terminal_ready" => parse::<TerminalParams>(params)
            .and_then(|p| host.terminal_ready(&p.tab_id))
            .map(|()| json!({ "ok": true })),
        "terminal_status" => parse::<TerminalParams>(params)
            .and_then(|p| host.terminal_status(&p.tab_id))
            .and_then(|s| Ok(serde_json::to_value(s)?)),
        "dismiss_alert" => parse::<DismissParams>(params)
            .and_then(|p| host.dismiss_alert(&p.tab_id, p.index))
            .map(|dismissed| json!({ "dismissed": dismissed })),
        "get_launch_preferences" => Ok(serde_json::to_value(host.launch_preferences())
            .unwrap_or(Value::Null)),
        "set_launch_preferences" => parse::<LaunchPreferences>(params).and_then(|prefs| {
            host.set_launch_preferences(prefs)?;
            Ok(serde_json::to_value(host.launch_preferences())?)
        }),
        "diagnostics" => parse::<DiagnosticsParams>(params).and_then(|p| build_diagnostics(p.session_id.as_deref())),
        _ => return None,
    };
    Some(result)
}

fn tab_op(
    host: &mut WorkspaceHost,
    params: &Value,
    op: impl FnOnce(&deckhand_kernel::TabStore, &str),
) -> anyhow::Result<Value> {
    let p = parse::<TabIdParams>(params)?;
    host.apply(|store| op(store, &p.id));
    Ok(build_tab_list(host))
}

fn tab_json(tab: &deckhand_kernel::WorkspaceTab, active_tab_id: &str) -> Value {
    let mut value = serde_json::to_value(tab).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("active".to_string(), Value::Bool(tab.id == active_tab_id));
    }
    value
}

/// Tabs in strip order, each flagged with whether it is active.
pub(crate) fn build_tab_list(host: &WorkspaceHost) -> Value {
    let state = host.store().snapshot();
    Value::Array(
        state
            .tabs
            .iter()
            .map(|t| tab_json(t, &state.active_tab_id))
            .collect(),
    )
}

fn build_diagnostics(session_id: Option<&str>) -> anyhow::Result<Value> {
    let with_ready = |d: diagnostics::TerminalDiagnostics| -> anyhow::Result<Value> {
        let ready = d.is_pipeline_ready();
        let mut value = serde_json::to_value(d)?;
        value["pipeline_ready"] = Value::Bool(ready);
        Ok(value)
    };
    match session_id {
        Some(id) => diagnostics::diagnostics_for(id).map_or(Ok(Value::Null), with_ready),
        None => {
            let mut out = serde_json::Map::new();
            for (id, d) in diagnostics::all_diagnostics() {
                out.insert(id, with_ready(d)?);
            }
            Ok(Value::Object(out))
        }
    }
}
