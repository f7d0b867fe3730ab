//! Error types for the query cache and the invoke seam.

use thiserror::Error;

use crate::key::QueryDomain;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("no cached data for command {command:?} in domain {domain}")]
    MissingQuery { command: String, domain: QueryDomain },

    #[error("{entity} with key {key:?} not found in cached list")]
    MissingListItem { entity: String, key: String },

    #[error("cached data for command {command:?} has unexpected shape: {detail}")]
    Shape { command: String, detail: String },
}

/// Failure of a request/response call. `Remote` carries the original
/// message from the other side unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("{0}")]
    Remote(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for InvokeError {
    fn from(e: serde_json::Error) -> Self {
        InvokeError::Decode(e.to_string())
    }
}
