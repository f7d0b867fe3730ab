//! `deckhand tabs | open-terminal | rename | close`.

use serde_json::{Map, Value, json};

use crate::cli::OpenTerminalOpts;
use crate::client::{TabClient, TabRow, UdsInvoker, rpc_call};

pub(crate) fn format_tab(tab: &TabRow) -> String {
    let marker = if tab.active { '*' } else { ' ' };
    format!("{marker} {:<24} {:<12} {}", tab.id, tab.tab_type, tab.title)
}

pub async fn cmd_tabs(socket_path: &str) -> anyhow::Result<()> {
    let mut client = TabClient::new(UdsInvoker::new(socket_path));
    for tab in client.list_tabs().await? {
        println!("{}", format_tab(&tab));
    }
    Ok(())
}

pub(crate) fn open_terminal_params(opts: &OpenTerminalOpts) -> Value {
    let mut launch = Map::new();
    if let Some(agent) = &opts.agent {
        launch.insert("agent".into(), json!(agent));
    }
    if let Some(model) = &opts.model {
        launch.insert("model".into(), json!(model));
    }
    json!({
        "type": "terminal",
        "title": opts.title.clone().unwrap_or_default(),
        "params": launch,
    })
}

pub async fn cmd_open_terminal(socket_path: &str, opts: &OpenTerminalOpts) -> anyhow::Result<()> {
    let opened = rpc_call(socket_path, "open_tab", open_terminal_params(opts)).await?;
    println!("{}", opened["id"].as_str().unwrap_or_default());
    Ok(())
}

pub async fn cmd_rename(socket_path: &str, tab_id: &str, title: &str) -> anyhow::Result<()> {
    let mut client = TabClient::new(UdsInvoker::new(socket_path));
    let tab = client.rename(tab_id, title).await?;
    println!("{}", format_tab(&tab));
    Ok(())
}

pub async fn cmd_close(socket_path: &str, tab_id: &str) -> anyhow::Result<()> {
    let mut client = TabClient::new(UdsInvoker::new(socket_path));
    for tab in client.close(tab_id).await? {
        println!("{}", format_tab(&tab));
    }
    Ok(())
}
