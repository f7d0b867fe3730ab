//! Built-in tab modules and the registry the daemon runs with.

use std::sync::Arc;

use serde_json::{Value, json};

use deckhand_kernel::{RegistryError, TabModule, TabTypeRegistry};
use deckhand_terminal::TerminalTabModule;

pub const TASK_DETAIL_TAB_TYPE: &str = "task-detail";

/// Read-only view of one task. Unmounted as soon as it loses focus.
#[derive(Debug, Default)]
pub struct TaskDetailTabModule;

impl TabModule for TaskDetailTabModule {
    fn type_tag(&self) -> &'static str {
        TASK_DETAIL_TAB_TYPE
    }

    fn default_params(&self) -> Value {
        json!({ "task_id": "new" })
    }

    fn validate_params(&self, params: &Value) -> Result<(), RegistryError> {
        let invalid = |detail: &str| RegistryError::InvalidParams {
            tab_type: TASK_DETAIL_TAB_TYPE.to_string(),
            detail: detail.to_string(),
        };
        match params.get("task_id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(()),
            Some(Value::Number(_)) => Ok(()),
            Some(_) => Err(invalid("task_id must be a non-empty string or number")),
            None => Err(invalid("missing task_id")),
        }
    }

    fn default_title(&self, params: &Value) -> String {
        match params.get("task_id") {
            Some(Value::String(id)) => format!("Task {id}"),
            Some(other) => format!("Task {other}"),
            None => "Task".to_string(),
        }
    }
}

pub fn builtin_registry() -> Result<TabTypeRegistry, RegistryError> {
    let mut registry = TabTypeRegistry::new();
    registry.register(Arc::new(TerminalTabModule))?;
    registry.register(Arc::new(TaskDetailTabModule))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_kernel::TabInput;

    #[test]
    fn builtin_modules_conform() {
        let registry = builtin_registry().expect("registry");
        registry.check_conformance().expect("conformance");
        let tags: Vec<&str> = registry.modules().map(|m| m.type_tag()).collect();
        assert_eq!(tags, vec!["task-detail", "terminal"]);
    }

    #[test]
    fn keep_alive_only_for_terminals() {
        let registry = builtin_registry().expect("registry");
        assert!(registry.keep_alive("terminal"));
        assert!(!registry.keep_alive(TASK_DETAIL_TAB_TYPE));
        assert!(!registry.keep_alive("unknown"));
    }

    #[test]
    fn task_detail_requires_task_id() {
        let module = TaskDetailTabModule;
        assert!(module.validate_params(&json!({"task_id": "T-12"})).is_ok());
        assert!(module.validate_params(&json!({"task_id": 12})).is_ok());
        assert!(module.validate_params(&json!({"task_id": ""})).is_err());
        assert!(module.validate_params(&json!({})).is_err());
        assert_eq!(module.default_title(&json!({"task_id": "T-12"})), "Task T-12");
        assert_eq!(module.default_title(&json!({"task_id": 7})), "Task 7");
    }

    #[test]
    fn prepare_rejects_bad_task_params_before_store() {
        let registry = builtin_registry().expect("registry");
        let input = TabInput::new(TASK_DETAIL_TAB_TYPE, "").with_params(json!({"task": 1}));
        assert!(matches!(
            registry.prepare(input),
            Err(RegistryError::InvalidParams { .. })
        ));

        let ok = registry
            .prepare(TabInput::new(TASK_DETAIL_TAB_TYPE, "").with_params(json!({"task_id": "T-1"})))
            .expect("prepare");
        assert_eq!(ok.title, "Task T-1");
    }
}
