//! Error types for the tab-type registry.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown tab type: {0}")]
    UnknownType(String),

    #[error("tab type already registered: {0}")]
    DuplicateType(String),

    #[error("invalid params for tab type {tab_type}: {detail}")]
    InvalidParams { tab_type: String, detail: String },

    #[error("tab module {tab_type} fails conformance: {detail}")]
    Conformance { tab_type: String, detail: String },
}
