//! The typed data model for every ACP request, response, notification, and
//! nested object. Each discriminated union carries its own tag field and
//! round-trips through JSON without loss; unknown object fields are ignored
//! to preserve forward compatibility, matching `serde`'s standard idiom.

mod capabilities;
mod common;
mod content;
mod fs;
mod init;
mod mcp_server;
mod permission;
mod prompt;
mod session;
mod tool_call;

pub use capabilities::{AgentCapabilities, ClientCapabilities, FileSystemCapability, PromptCapabilities};
pub use common::{EnvVariable, ProtocolVersion, SessionId};
pub use content::{
    AudioContentBlock, ContentBlock, EmbeddedResourceContentBlock, EmbeddedResourceContents,
    ImageContentBlock, ResourceContentBlock, TextContentBlock,
};
pub use fs::{ReadTextFileRequest, ReadTextFileResponse, WriteTextFileRequest, WriteTextFileResponse};
pub use init::{
    AuthMethod, AuthMethodId, AuthenticateRequest, AuthenticateResponse, Implementation,
    InitializeRequest, InitializeResponse,
};
pub use mcp_server::{HttpMcpServer, McpServer, SseMcpServer, StdioMcpServer};
pub use permission::{
    AllowedOutcome, DeniedOutcome, PermissionOption, PermissionOptionId, PermissionOptionKind,
    RequestPermissionOutcome, RequestPermissionRequest, RequestPermissionResponse,
};
pub use prompt::{CancelNotification, PromptRequest, PromptResponse, StopReason};
pub use session::{
    AvailableCommand, LoadSessionRequest, LoadSessionResponse, NewSessionRequest,
    NewSessionResponse, Plan, PlanEntry, PlanEntryPriority, PlanEntryStatus, SessionMode,
    SessionModeId, SessionModeState, SessionNotification, SessionUpdate, SetSessionModeRequest,
    SetSessionModeResponse,
};
pub use tool_call::{
    ContentToolCallContent, FileEditToolCallContent, TerminalToolCallContent, ToolCall,
    ToolCallContent, ToolCallId, ToolCallKind, ToolCallLocation, ToolCallStatus, ToolCallUpdate,
};
