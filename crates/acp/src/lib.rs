#![forbid(unsafe_code)]
//! Async runtime for the Agent Client Protocol (ACP): a bidirectional
//! JSON-RPC 2.0 peer over a line-delimited duplex byte stream, connecting an
//! editor or host (the *client*) to a coding agent (the *agent*) running as
//! a child process or across any other duplex transport.
//!
//! Either side of the wire can issue requests and notifications to the
//! other; this crate gives both roles the same underlying connection and a
//! typed, catalog-driven dispatcher on top of it.
//!
//! ## Wire format
//! - One JSON-RPC 2.0 object per line (`\n`-terminated), enforced by
//!   [`FrameReader`]/[`FrameWriter`]. A line past [`ConnectionConfig::max_line_bytes`]
//!   is discarded and the reader resynchronizes at the next newline rather
//!   than tearing down the connection.
//! - [`wire::Envelope::classify`] sorts every inbound object into a request,
//!   a notification, a response, or a malformed line, per the JSON-RPC 2.0
//!   discriminator rules (presence of `id` and/or `method`).
//!
//! ## Connecting
//! - [`connection::ConnectionCore`] owns the writer task, the pending-request
//!   table, and the reader loop; it is generic over which
//!   [`connection::InboundHandler`] decodes inbound traffic, so it backs
//!   both roles identically.
//! - [`AgentSideConnection`] and [`ClientSideConnection`] are the two public
//!   façades: each is constructed with a factory closure that receives a
//!   connection handle *before* the reader loop starts, so a user's
//!   [`Agent`]/[`Client`] implementation can make outbound calls from within
//!   its own inbound handlers.
//!
//! ## Method catalog
//! - [`meta::AGENT_METHODS`] and [`meta::CLIENT_METHODS`] list every method
//!   each side handles; anything outside those tables routes to
//!   `ext_method`/`ext_notification` without requiring any special naming
//!   convention.
//! - [`PROTOCOL_VERSION`] is the version this crate negotiates during
//!   `initialize`.
//!
//! ## Cancellation
//! - Inbound `session/prompt` handlers are handed a [`connection::CancelToken`]
//!   that resolves once the peer sends `session/cancel` for that session.
//! - Outbound prompts use [`client::PendingPrompt`]: dropping one before it
//!   resolves sends `session/cancel` for its session automatically.
//!
//! ```rust,no_run
//! use acp::{Agent, AgentSideConnection, CancelToken, ConnectionConfig};
//! use acp::{InitializeRequest, InitializeResponse, NewSessionRequest, NewSessionResponse};
//! use acp::{PromptRequest, PromptResponse, StopReason, Result};
//!
//! struct EchoAgent;
//!
//! impl Agent for EchoAgent {
//!     async fn initialize(&self, _args: InitializeRequest) -> Result<InitializeResponse> {
//!         Ok(InitializeResponse { protocol_version: acp::PROTOCOL_VERSION, agent_capabilities: None, auth_methods: vec![] })
//!     }
//!
//!     async fn new_session(&self, _args: NewSessionRequest) -> Result<NewSessionResponse> {
//!         Ok(NewSessionResponse { session_id: "session-1".into(), modes: None })
//!     }
//!
//!     async fn prompt(&self, _args: PromptRequest, _cancel: CancelToken) -> Result<PromptResponse> {
//!         Ok(PromptResponse { stop_reason: StopReason::EndTurn })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (outgoing, incoming) = tokio::io::duplex(4096);
//! let conn = AgentSideConnection::new(|_conn| EchoAgent, outgoing, incoming, ConnectionConfig::default());
//! # let _ = conn;
//! # }
//! ```

pub mod agent;
pub mod client;
pub mod config;
pub mod connection;
mod error;
mod framer;
pub mod meta;
pub mod schema;
pub mod stdio;
mod wire;

pub use agent::{Agent, AgentSideConnection};
pub use client::{Client, ClientSideConnection, PendingPrompt};
pub use config::{ConnectionConfig, DEFAULT_MAX_LINE_BYTES};
pub use connection::{CancelToken, ConnectionCore, InboundHandler};
pub use error::{Error, FramingError, Result, RpcError};
pub use framer::{FrameReader, FrameWriter};
pub use meta::{agent_method, client_method, MethodEntry, MethodKind, AGENT_METHODS, CLIENT_METHODS, PROTOCOL_VERSION};
pub use schema::*;
pub use stdio::process_stdio;
pub use wire::{Classification, Envelope, JsonRpcVersion, RequestId};
