use thiserror::Error;

use crate::wire::RequestId;

/// Standard JSON-RPC 2.0 error code: invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// Standard JSON-RPC 2.0 error code: the JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// Standard JSON-RPC 2.0 error code: the method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Standard JSON-RPC 2.0 error code: invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Standard JSON-RPC 2.0 error code: internal error.
pub const INTERNAL_ERROR: i64 = -32603;
/// ACP-specific error code: the request was cancelled before completion.
pub const REQUEST_CANCELLED: i64 = -32800;

/// A JSON-RPC 2.0 error object, as carried in an envelope's `error` field.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn cancelled() -> Self {
        Self::new(REQUEST_CANCELLED, "request cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == REQUEST_CANCELLED
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

/// Errors surfaced while framing a duplex byte stream into line-delimited JSON values.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("line exceeded the maximum of {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("line was not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("line was not a JSON object: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("failed to read from transport: {0}")]
    Io(#[source] std::io::Error),
}

/// Errors surfaced by the connection/dispatch layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection is closed")]
    Closed,
    #[error("request {id} was cancelled")]
    Cancelled { id: RequestId },
    #[error("peer returned an error: {0}")]
    Peer(#[from] RpcError),
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error("failed to serialize {method}: {source}")]
    Serialize {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse {context} for {method}: {source}")]
    Deserialize {
        context: &'static str,
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no handler registered for method `{0}`")]
    MethodNotFound(String),
    #[error("failed to write to transport: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to join background task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Maps this error onto the JSON-RPC error object sent back to the peer for a
    /// failed inbound request, per the taxonomy in the error handling design.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Error::Cancelled { .. } => RpcError::cancelled(),
            Error::Peer(err) => err.clone(),
            Error::Deserialize { .. } => RpcError::invalid_params(self.to_string()),
            Error::MethodNotFound(method) => RpcError::method_not_found(method),
            Error::Framing(_) | Error::Closed | Error::Serialize { .. } | Error::Write(_)
            | Error::Join(_) => RpcError::internal(self.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
