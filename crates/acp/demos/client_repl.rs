//! Spawns an ACP agent binary as a subprocess, wires its stdio into a
//! [`ClientSideConnection`], and offers a line-at-a-time REPL that sends
//! each line as a prompt and prints streamed message chunks as they arrive.
//!
//! ```bash
//! cargo run -p acp --example client_repl -- path/to/agent-binary
//! ```

use std::env;
use std::process::Stdio;

use acp::{
    Client, ClientSideConnection, ConnectionConfig, ContentBlock, InitializeRequest,
    NewSessionRequest, PromptRequest, ReadTextFileRequest, ReadTextFileResponse,
    RequestPermissionOutcome, RequestPermissionRequest, RequestPermissionResponse,
    SessionNotification, SessionUpdate, WriteTextFileRequest, WriteTextFileResponse,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

struct ReplClient;

impl Client for ReplClient {
    async fn request_permission(&self, args: RequestPermissionRequest) -> acp::Result<RequestPermissionResponse> {
        // Auto-allow every permission request from a REPL session; a real
        // client would prompt the user here.
        let outcome = match args.options.first() {
            Some(option) => RequestPermissionOutcome::Allowed(acp::AllowedOutcome { option_id: option.id.clone() }),
            None => RequestPermissionOutcome::Denied(acp::DeniedOutcome {}),
        };
        Ok(RequestPermissionResponse { outcome })
    }

    async fn read_text_file(&self, _args: ReadTextFileRequest) -> acp::Result<ReadTextFileResponse> {
        Err(acp::Error::MethodNotFound("fs/read_text_file".into()))
    }

    async fn write_text_file(&self, _args: WriteTextFileRequest) -> acp::Result<WriteTextFileResponse> {
        Err(acp::Error::MethodNotFound("fs/write_text_file".into()))
    }

    async fn session_notification(&self, notification: SessionNotification) {
        if let SessionUpdate::AgentMessageChunk { content } = notification.update {
            if let Some(text) = content.as_text() {
                println!("| agent: {text}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = env::args().skip(1);
    let agent_binary = match argv.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: client_repl <agent-binary> [args...]");
            std::process::exit(2);
        }
    };

    let mut child = Command::new(&agent_binary)
        .args(argv)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    let stdin = child.stdin.take().expect("child stdin was piped");
    let stdout = child.stdout.take().expect("child stdout was piped");

    let conn = ClientSideConnection::new(|_conn| ReplClient, stdin, stdout, ConnectionConfig::default());

    conn.initialize(InitializeRequest {
        protocol_version: acp::PROTOCOL_VERSION,
        client_capabilities: Default::default(),
        client_info: None,
    })
    .await?;
    let session = conn.new_session(NewSessionRequest { cwd: env::current_dir()?, mcp_servers: vec![] }).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        let response = conn
            .prompt(PromptRequest { session_id: session.session_id.clone(), prompt: vec![ContentBlock::text(line)] })
            .wait()
            .await?;
        println!("(stopped: {:?})", response.stop_reason);
    }

    let _ = child.kill().await;
    Ok(())
}
