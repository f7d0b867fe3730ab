//! UDS JSON-RPC client for CLI subcommands, and the cached tab view built
//! on top of it.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use deckhand_cache::{Invoke, InvokeError, QueryClient, QueryDomain, QueryKey};

async fn call(socket_path: &str, method: &str, params: Value) -> Result<Value, InvokeError> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| InvokeError::Transport(format!("cannot connect to daemon at {socket_path}: {e}")))?;

    let (reader, mut writer) = stream.into_split();

    let request = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    let transport = |e: std::io::Error| InvokeError::Transport(e.to_string());
    writer.write_all(req.as_bytes()).await.map_err(transport)?;
    writer.shutdown().await.map_err(transport)?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await.map_err(transport)?;

    let response: Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(InvokeError::Remote(message.to_string()));
    }

    Ok(response["result"].clone())
}

pub(crate) async fn rpc_call(socket_path: &str, method: &str, params: Value) -> anyhow::Result<Value> {
    Ok(call(socket_path, method, params).await?)
}

/// [`Invoke`] over the daemon socket.
#[derive(Debug, Clone)]
pub struct UdsInvoker {
    socket_path: String,
}

impl UdsInvoker {
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }
}

impl Invoke for UdsInvoker {
    fn invoke(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> impl Future<Output = Result<Value, InvokeError>> + Send {
        let socket_path = self.socket_path.clone();
        let command = command.to_string();
        async move { call(&socket_path, &command, args.unwrap_or(Value::Null)).await }
    }
}

// ─── Cached tab view ──────────────────────────────────────────────

pub(crate) const LIST_TABS: &str = "list_tabs";
const TAB_ENTITY: &str = "tab";

/// One entry of `list_tabs`. Fields this view does not use are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRow {
    pub id: String,
    #[serde(rename = "type")]
    pub tab_type: String,
    pub title: String,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn list_key() -> QueryKey {
    QueryKey::list(QueryDomain::Workspace, LIST_TABS)
}

pub struct TabClient<I> {
    client: QueryClient<I>,
}

impl<I: Invoke> TabClient<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            client: QueryClient::new(invoker),
        }
    }

    pub async fn list_tabs(&mut self) -> anyhow::Result<Vec<TabRow>> {
        let value = self.client.query(QueryDomain::Workspace, LIST_TABS, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Rename optimistically. The cached list shows the new title at once
    /// and is restored exactly if the daemon rejects the change.
    pub async fn rename(&mut self, tab_id: &str, title: &str) -> anyhow::Result<TabRow> {
        let tabs = self.list_tabs().await?;
        let mut patched = tabs
            .into_iter()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| anyhow::anyhow!("tab not found: {tab_id}"))?;
        patched.title = title.to_string();

        let rollback = self.client.cache_mut().replace_list_item_in_query_cache_optimistically(
            QueryDomain::Workspace,
            LIST_TABS,
            patched,
            |t: &TabRow| t.id.clone(),
            TAB_ENTITY,
        )?;

        match self
            .client
            .mutate("set_tab_meta", Some(json!({"id": tab_id, "title": title})))
            .await
        {
            Ok(value) => {
                let confirmed: TabRow = serde_json::from_value(value)?;
                self.client.cache_mut().replace_list_item_in_query_cache(
                    QueryDomain::Workspace,
                    LIST_TABS,
                    confirmed.clone(),
                    |t: &TabRow| t.id.clone(),
                    TAB_ENTITY,
                )?;
                Ok(confirmed)
            }
            Err(e) => {
                tracing::debug!(tab_id, error = %e, "rename rejected, rolling back");
                rollback.apply(self.client.cache_mut());
                Err(e.into())
            }
        }
    }

    /// Close a tab and drop it from the cached list.
    pub async fn close(&mut self, tab_id: &str) -> anyhow::Result<Vec<TabRow>> {
        self.list_tabs().await?;
        let value = self
            .client
            .mutate("close_tab", Some(json!({ "id": tab_id })))
            .await?;
        let tabs: Vec<TabRow> = serde_json::from_value(value.clone())?;
        if !tabs.iter().any(|t| t.id == tab_id) {
            self.client.cache_mut().remove_list_item_from_query_cache(
                QueryDomain::Workspace,
                LIST_TABS,
                &tab_id.to_string(),
                |t: &TabRow| t.id.clone(),
                TAB_ENTITY,
            )?;
        }
        // Closing can move activation, so the daemon's list wins.
        self.client.cache_mut().set_query_data(list_key(), value);
        Ok(tabs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use deckhand_terminal::{HostError, LaunchSpec, PtyHost};
    use parking_lot::Mutex;

    use crate::config::Config;
    use crate::preferences::PreferenceStore;
    use crate::server::dispatch;
    use crate::tabs::builtin_registry;
    use crate::workspace::WorkspaceHost;

    struct NullHost;

    impl PtyHost for NullHost {
        fn spawn(&self, _: &str, _: &LaunchSpec) -> Result<(), HostError> {
            Ok(())
        }
        fn write(&self, _: &str, _: &[u8]) -> Result<(), HostError> {
            Ok(())
        }
        fn resize(&self, _: &str, _: u16, _: u16) -> Result<(), HostError> {
            Ok(())
        }
        fn close(&self, _: &str) -> Result<(), HostError> {
            Ok(())
        }
    }

    /// Serves requests straight from an in-process workspace.
    struct InProcess {
        host: Mutex<WorkspaceHost>,
        reject_meta: AtomicBool,
        _dir: tempfile::TempDir,
    }

    impl InProcess {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let host = WorkspaceHost::new(
                Config::default(),
                builtin_registry().expect("registry"),
                Arc::new(NullHost),
                PreferenceStore::new(dir.path(), "prefs"),
            );
            Self {
                host: Mutex::new(host),
                reject_meta: AtomicBool::new(false),
                _dir: dir,
            }
        }

        fn open(&self, id: &str) {
            let params = json!({"id": id, "type": "task-detail", "params": {"task_id": id}});
            dispatch(&mut self.host.lock(), "open_tab", &params)
                .expect("method")
                .expect("open");
        }
    }

    impl Invoke for InProcess {
        fn invoke(
            &self,
            command: &str,
            args: Option<Value>,
        ) -> impl Future<Output = Result<Value, InvokeError>> + Send {
            let result = if command == "set_tab_meta" && self.reject_meta.load(Ordering::SeqCst) {
                Err(InvokeError::Remote("tab is read-only".into()))
            } else {
                match dispatch(&mut self.host.lock(), command, &args.unwrap_or(Value::Null)) {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(e)) => Err(InvokeError::Remote(e.to_string())),
                    None => Err(InvokeError::Remote("method not found".into())),
                }
            };
            async move { result }
        }
    }

    fn cached<I: Invoke>(tabs: &TabClient<I>) -> Vec<TabRow> {
        tabs.client
            .cache()
            .get_as(&list_key())
            .expect("decode")
            .expect("cached")
    }

    fn titles(tabs: &[TabRow]) -> Vec<&str> {
        tabs.iter().map(|t| t.title.as_str()).collect()
    }

    #[tokio::test]
    async fn rename_patches_cache_and_confirms() {
        let daemon = InProcess::new();
        daemon.open("A");
        daemon.open("B");
        let mut tabs = TabClient::new(&daemon);

        let renamed = tabs.rename("A", "Alpha").await.expect("rename");
        assert_eq!(renamed.title, "Alpha");
        assert_eq!(renamed.extra["params"], json!({"task_id": "A"}));
        let cached = cached(&tabs);
        assert_eq!(titles(&cached), vec!["Alpha", "Task B"]);
    }

    #[tokio::test]
    async fn rejected_rename_restores_exact_cache() {
        let daemon = InProcess::new();
        daemon.open("A");
        let mut tabs = TabClient::new(&daemon);
        tabs.list_tabs().await.expect("list");
        let before = tabs.client.cache().get(&list_key()).cloned();

        daemon.reject_meta.store(true, Ordering::SeqCst);
        let err = tabs.rename("A", "Alpha").await.unwrap_err();
        assert_eq!(err.to_string(), "tab is read-only");
        assert_eq!(tabs.client.cache().get(&list_key()).cloned(), before);
    }

    #[tokio::test]
    async fn rename_unknown_tab_fails_without_patch() {
        let daemon = InProcess::new();
        daemon.open("A");
        let mut tabs = TabClient::new(&daemon);
        assert!(tabs.rename("Z", "nope").await.is_err());
        let cached = cached(&tabs);
        assert_eq!(titles(&cached), vec!["Task A"]);
    }

    #[tokio::test]
    async fn close_drops_tab_from_cache() {
        let daemon = InProcess::new();
        daemon.open("A");
        daemon.open("B");
        let mut tabs = TabClient::new(&daemon);

        let remaining = tabs.close("B").await.expect("close");
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].active);
        let cached = cached(&tabs);
        assert_eq!(cached, remaining);
    }
}
