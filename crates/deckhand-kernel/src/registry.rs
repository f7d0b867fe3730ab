//! Tab-type registry: maps a type tag to the module that owns that tab type.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RegistryError;
use crate::tab::TabInput;

/// Behaviour owned by one tab type.
pub trait TabModule: Send + Sync {
    /// Tag stored in [`WorkspaceTab::tab_type`](crate::WorkspaceTab::tab_type).
    fn type_tag(&self) -> &'static str;

    /// Whether tabs of this type stay mounted while inactive.
    fn keep_alive_on_deactivate(&self) -> bool {
        false
    }

    /// Params a freshly created tab of this type would carry.
    fn default_params(&self) -> Value;

    fn validate_params(&self, params: &Value) -> Result<(), RegistryError>;

    fn default_title(&self, params: &Value) -> String;
}

#[derive(Default, Clone)]
pub struct TabTypeRegistry {
    modules: BTreeMap<&'static str, Arc<dyn TabModule>>,
}

impl TabTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn TabModule>) -> Result<(), RegistryError> {
        let tag = module.type_tag();
        if self.modules.contains_key(tag) {
            return Err(RegistryError::DuplicateType(tag.to_string()));
        }
        self.modules.insert(tag, module);
        Ok(())
    }

    pub fn get(&self, tab_type: &str) -> Option<&Arc<dyn TabModule>> {
        self.modules.get(tab_type)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn TabModule>> {
        self.modules.values()
    }

    /// Keep-alive predicate for the kernel. Unknown types are not kept alive.
    pub fn keep_alive(&self, tab_type: &str) -> bool {
        self.get(tab_type)
            .is_some_and(|m| m.keep_alive_on_deactivate())
    }

    /// Check an open request against its module, filling in a default
    /// title when the caller left it empty.
    pub fn prepare(&self, mut input: TabInput) -> Result<TabInput, RegistryError> {
        let module = self
            .get(&input.tab_type)
            .ok_or_else(|| RegistryError::UnknownType(input.tab_type.clone()))?;
        if input.params.is_null() {
            input.params = module.default_params();
        }
        module.validate_params(&input.params)?;
        if input.title.is_empty() {
            input.title = module.default_title(&input.params);
        }
        Ok(input)
    }

    /// Verify every registered module provides its required members.
    pub fn check_conformance(&self) -> Result<(), RegistryError> {
        for (&tag, module) in &self.modules {
            let fail = |detail: &str| RegistryError::Conformance {
                tab_type: tag.to_string(),
                detail: detail.to_string(),
            };
            if tag.is_empty() {
                return Err(fail("empty type tag"));
            }
            let params = module.default_params();
            module
                .validate_params(&params)
                .map_err(|e| fail(&format!("default params rejected: {e}")))?;
            if module.default_title(&params).trim().is_empty() {
                return Err(fail("empty default title"));
            }
        }
        Ok(())
    }
}
