//! Query keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Partition for otherwise identical commands used in different scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDomain {
    App,
    Workspace,
}

impl QueryDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for QueryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(domain, command, args)`. Args are stored as canonical JSON text so
/// equal argument objects produce equal keys regardless of field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub domain: QueryDomain,
    pub command: String,
    args: Option<String>,
}

impl QueryKey {
    pub fn new(domain: QueryDomain, command: impl Into<String>, args: Option<&Value>) -> Self {
        Self {
            domain,
            command: command.into(),
            args: args.filter(|a| !a.is_null()).map(Value::to_string),
        }
    }

    /// Key for a list query, which carries no args.
    pub fn list(domain: QueryDomain, command: impl Into<String>) -> Self {
        Self::new(domain, command, None)
    }

    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }
}
