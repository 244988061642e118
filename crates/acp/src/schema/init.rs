//! `initialize` and `authenticate`: the handshake that negotiates protocol
//! version, capabilities, and (optionally) authentication before any session
//! is created.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capabilities::{AgentCapabilities, ClientCapabilities};
use super::common::ProtocolVersion;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub protocol_version: ProtocolVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_capabilities: Option<ClientCapabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_info: Option<Implementation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub protocol_version: ProtocolVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_capabilities: Option<AgentCapabilities>,
    #[serde(default)]
    pub auth_methods: Vec<AuthMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthMethodId(pub Arc<str>);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMethod {
    pub id: AuthMethodId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub method_id: AuthMethodId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticateResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_null_client_capabilities_parses_as_absent() {
        let raw = r#"{"protocolVersion":1,"clientCapabilities":null}"#;
        let request: InitializeRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.protocol_version, 1);
        assert!(request.client_capabilities.is_none());
    }

    #[test]
    fn omitted_client_capabilities_also_parses_as_absent() {
        let raw = r#"{"protocolVersion":1}"#;
        let request: InitializeRequest = serde_json::from_str(raw).unwrap();
        assert!(request.client_capabilities.is_none());
    }
}
