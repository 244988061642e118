//! Small shared value types used across the schema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque identifier for an agent-maintained conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Arc<str>);

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(Arc::from(value))
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(Arc::from(value.as_str()))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An environment variable passed to a spawned MCP server or terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    pub name: String,
    pub value: String,
}

/// The protocol version number, exchanged during `initialize`.
pub type ProtocolVersion = u32;
