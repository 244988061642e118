//! Minimal ACP agent that echoes each prompt's text content back as a
//! single streamed chunk, then ends the turn.
//!
//! Run it under an ACP-speaking client, or pipe another process's stdout
//! into its stdin to exercise the wire protocol by hand:
//! ```bash
//! cargo run -p acp --example echo_agent
//! ```

use acp::{
    Agent, AgentSideConnection, CancelToken, ConnectionConfig, ContentBlock, InitializeRequest,
    InitializeResponse, NewSessionRequest, NewSessionResponse, PromptRequest, PromptResponse,
    SessionNotification, SessionUpdate, StopReason,
};

struct EchoAgent {
    conn: AgentSideConnection,
}

impl Agent for EchoAgent {
    async fn initialize(&self, args: InitializeRequest) -> acp::Result<InitializeResponse> {
        Ok(InitializeResponse { protocol_version: args.protocol_version, agent_capabilities: None, auth_methods: vec![] })
    }

    async fn new_session(&self, _args: NewSessionRequest) -> acp::Result<NewSessionResponse> {
        Ok(NewSessionResponse { session_id: "sess-1".into(), modes: None })
    }

    async fn prompt(&self, args: PromptRequest, _cancel: CancelToken) -> acp::Result<PromptResponse> {
        for block in &args.prompt {
            let text = block.as_text().unwrap_or_default();
            self.conn.session_update(SessionNotification {
                session_id: args.session_id.clone(),
                update: SessionUpdate::AgentMessageChunk { content: ContentBlock::text(text) },
            })?;
        }
        Ok(PromptResponse { stop_reason: StopReason::EndTurn })
    }
}

#[tokio::main]
async fn main() {
    let (incoming, outgoing) = acp::process_stdio();
    let _conn = AgentSideConnection::new(|conn| EchoAgent { conn }, outgoing, incoming, ConnectionConfig::default());
    // Block forever; the connection's reader/writer tasks do the real work
    // and the process exits once the peer closes its end of the pipe.
    std::future::pending::<()>().await
}
