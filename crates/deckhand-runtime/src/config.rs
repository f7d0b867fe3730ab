//! Daemon configuration loaded from TOML.
//!
//! Lookup: `$DECKHAND_CONFIG`, then `$XDG_CONFIG_HOME/deckhand/config.toml`,
//! then `$HOME/.config/deckhand/config.toml`. A missing file means defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use deckhand_kernel::DEFAULT_MAX_TABS;
use deckhand_terminal::{LaunchSpec, TerminalLaunchParams};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_tabs: usize,
    /// Tab types kept mounted while inactive. Unset means each tab module
    /// decides for itself.
    pub keep_alive_types: Option<Vec<String>>,
    pub terminal: TerminalConfig,
    pub agents: BTreeMap<String, AgentProfile>,
    pub preferences_dir: Option<PathBuf>,
    pub preferences_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tabs: DEFAULT_MAX_TABS,
            keep_alive_types: None,
            terminal: TerminalConfig::default(),
            agents: BTreeMap::new(),
            preferences_dir: None,
            preferences_key: "launch-preferences".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cols: u16,
    pub rows: u16,
    pub scrollback: usize,
    pub shell: Option<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: 120,
            rows: 32,
            scrollback: 1000,
            shell: None,
        }
    }
}

/// How to turn an agent name into a command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    pub command: String,
    pub args: Vec<String>,
    pub model_flag: Option<String>,
    pub effort_flag: Option<String>,
    pub thinking_flag: Option<String>,
}

fn resolve_shell(configured: Option<&str>) -> String {
    if let Some(shell) = configured.filter(|s| !s.is_empty()) {
        return shell.to_string();
    }
    match std::env::var("SHELL") {
        Ok(shell) if !shell.is_empty() => shell,
        _ => "/bin/sh".to_string(),
    }
}

impl Config {
    /// Load from the resolved config path, or defaults if there is none.
    pub fn load() -> anyhow::Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn preferences_dir(&self) -> PathBuf {
        self.preferences_dir
            .clone()
            .or_else(|| config_dir().map(|d| d.join("state")))
            .unwrap_or_else(|| std::env::temp_dir().join("deckhand"))
    }

    /// Build the command for a terminal session. Known agents use their
    /// profile; anything else runs the shell, with the agent name as the
    /// command when one was given.
    pub fn launch_spec(&self, launch: &TerminalLaunchParams, cols: u16, rows: u16) -> LaunchSpec {
        let (program, args) = match launch.agent.as_deref() {
            Some(agent) => match self.agents.get(agent) {
                Some(profile) => (profile.command.clone(), profile_args(profile, launch)),
                None => (agent.to_string(), Vec::new()),
            },
            None => (resolve_shell(self.terminal.shell.as_deref()), Vec::new()),
        };
        let cwd = launch
            .human_session
            .as_ref()
            .and_then(|h| h.cwd.as_ref())
            .map(PathBuf::from);

        LaunchSpec {
            program,
            args,
            cwd,
            env: vec![("TERM".to_string(), "xterm-256color".to_string())],
            cols,
            rows,
        }
    }
}

fn profile_args(profile: &AgentProfile, launch: &TerminalLaunchParams) -> Vec<String> {
    let mut args = profile.args.clone();
    if let (Some(flag), Some(model)) = (&profile.model_flag, &launch.model) {
        args.push(flag.clone());
        args.push(model.clone());
    }
    if let (Some(flag), Some(effort)) = (&profile.effort_flag, &launch.effort) {
        args.push(flag.clone());
        args.push(effort.clone());
    }
    if let (Some(flag), Some(true)) = (&profile.thinking_flag, launch.thinking) {
        args.push(flag.clone());
    }
    args
}

fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join("deckhand"));
        }
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("deckhand"))
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DECKHAND_CONFIG") {
        return Some(PathBuf::from(path));
    }
    config_dir().map(|d| d.join("config.toml"))
}
