//! The raw JSON-RPC 2.0 envelope shape and its classification into request,
//! response, notification, or error, mirroring the teacher's `Incoming`
//! enum in `mcp/jsonrpc.rs` but generalized to both directions of traffic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// A JSON-RPC 2.0 request/response identifier.
///
/// This core only ever mints non-negative integer ids for its own outbound
/// requests, but a peer is free to use strings; those round-trip as opaque
/// values keyed by their canonical JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        RequestId::Number(value)
    }
}

/// Wire envelope: exactly one JSON-RPC 2.0 object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub jsonrpc: JsonRpcVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum JsonRpcVersion {
    #[serde(rename = "2.0")]
    V2,
}

impl Envelope {
    pub fn request(id: RequestId, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::V2,
            id: Some(id),
            method: Some(method.into()),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    pub fn notification(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::V2,
            id: None,
            method: Some(method.into()),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    pub fn response(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::V2,
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn error_response(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::V2,
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    pub fn classify(&self) -> Classification {
        match (&self.method, &self.id) {
            (Some(_), Some(_)) => Classification::Request,
            (Some(_), None) => Classification::Notification,
            (None, Some(_)) if self.result.is_some() || self.error.is_some() => {
                Classification::Response
            }
            _ => Classification::Malformed,
        }
    }
}

/// The exclusive classification of an inbound envelope, per the data model's
/// invariant that classification never overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Request,
    Notification,
    Response,
    Malformed,
}
