//! Terminal session configuration and the `terminal` tab module.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use deckhand_kernel::{RegistryError, TabModule};

pub const TERMINAL_TAB_TYPE: &str = "terminal";

/// Who the session is being run for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// Launch parameters carried in a terminal tab's params.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalLaunchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_session: Option<HumanSession>,
}

impl TerminalLaunchParams {
    pub fn from_params(params: &Value) -> Result<Self, serde_json::Error> {
        if params.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(params.clone())
    }

    /// Short label naming what runs in the session, e.g. `claude · opus`.
    pub fn label(&self) -> String {
        let agent = self.agent.as_deref().unwrap_or("shell");
        match &self.model {
            Some(model) => format!("{agent} · {model}"),
            None => agent.to_string(),
        }
    }
}

/// A launched session: one session id bound to one remote PTY process.
///
/// Session ids are minted per launch and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSessionConfig {
    pub session_id: String,
    #[serde(flatten)]
    pub launch: TerminalLaunchParams,
}

impl TerminalSessionConfig {
    pub fn new(launch: TerminalLaunchParams) -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4().simple()),
            launch,
        }
    }
}

/// Tab module for `terminal` tabs. Terminals stay mounted while inactive so
/// PTY output and scrollback are not lost.
#[derive(Debug, Default)]
pub struct TerminalTabModule;

impl TabModule for TerminalTabModule {
    fn type_tag(&self) -> &'static str {
        TERMINAL_TAB_TYPE
    }

    fn keep_alive_on_deactivate(&self) -> bool {
        true
    }

    fn default_params(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    fn validate_params(&self, params: &Value) -> Result<(), RegistryError> {
        TerminalLaunchParams::from_params(params)
            .map(|_| ())
            .map_err(|e| RegistryError::InvalidParams {
                tab_type: TERMINAL_TAB_TYPE.to_string(),
                detail: e.to_string(),
            })
    }

    fn default_title(&self, params: &Value) -> String {
        TerminalLaunchParams::from_params(params)
            .map(|p| p.label())
            .unwrap_or_else(|_| "terminal".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_ids_are_unique() {
        let a = TerminalSessionConfig::new(TerminalLaunchParams::default());
        let b = TerminalSessionConfig::new(TerminalLaunchParams::default());
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn label_prefers_agent_and_model() {
        let params = TerminalLaunchParams {
            agent: Some("claude".into()),
            model: Some("opus".into()),
            ..Default::default()
        };
        assert_eq!(params.label(), "claude · opus");
        assert_eq!(TerminalLaunchParams::default().label(), "shell");
    }

    #[test]
    fn config_serializes_flat() {
        let config = TerminalSessionConfig {
            session_id: "s1".into(),
            launch: TerminalLaunchParams {
                agent: Some("codex".into()),
                thinking: Some(true),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&config).expect("encode");
        assert_eq!(value, json!({"session_id": "s1", "agent": "codex", "thinking": true}));
    }

    #[test]
    fn module_validates_params() {
        let module = TerminalTabModule;
        assert!(module.validate_params(&json!({"agent": "claude"})).is_ok());
        assert!(module.validate_params(&Value::Null).is_ok());
        assert!(module.validate_params(&json!({"agent": 3})).is_err());
        assert!(module.validate_params(&json!("claude")).is_err());
        assert_eq!(module.default_title(&json!({"agent": "claude"})), "claude");
    }
}
