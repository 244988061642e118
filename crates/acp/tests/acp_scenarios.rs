//! End-to-end scenarios driving a real [`AgentSideConnection`] against a
//! real [`ClientSideConnection`] over two in-process duplex pipes, the way a
//! client process and an agent subprocess would talk over stdio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acp::{
    Agent, AgentSideConnection, CancelToken, Client, ClientSideConnection,
    ConnectionConfig, ContentBlock, Error, InitializeRequest, InitializeResponse,
    NewSessionRequest, NewSessionResponse, PromptRequest, PromptResponse, ReadTextFileRequest,
    ReadTextFileResponse, RequestPermissionOutcome, RequestPermissionRequest,
    RequestPermissionResponse, SessionNotification, SessionUpdate, StopReason,
    WriteTextFileRequest, WriteTextFileResponse,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

struct TestAgent {
    client: AgentSideConnection,
    prompt_calls: Arc<Mutex<u32>>,
    updates_before_cancel: Arc<AtomicBool>,
}

impl Agent for TestAgent {
    async fn initialize(&self, args: InitializeRequest) -> acp::Result<InitializeResponse> {
        Ok(InitializeResponse {
            protocol_version: args.protocol_version.min(acp::PROTOCOL_VERSION),
            agent_capabilities: None,
            auth_methods: vec![],
        })
    }

    async fn new_session(&self, _args: NewSessionRequest) -> acp::Result<NewSessionResponse> {
        Ok(NewSessionResponse { session_id: "session-1".into(), modes: None })
    }

    async fn prompt(&self, args: PromptRequest, cancel: CancelToken) -> acp::Result<PromptResponse> {
        *self.prompt_calls.lock().await += 1;

        if args.prompt.first().and_then(ContentBlock::as_text) == Some("stream") {
            for i in 0..3 {
                if cancel.is_cancelled() {
                    return Ok(PromptResponse { stop_reason: StopReason::Cancelled });
                }
                let _ = self.client.session_update(SessionNotification {
                    session_id: args.session_id.clone(),
                    update: SessionUpdate::AgentMessageChunk { content: ContentBlock::text(format!("chunk {i}")) },
                });
            }
            return Ok(PromptResponse { stop_reason: StopReason::EndTurn });
        }

        if args.prompt.first().and_then(ContentBlock::as_text) == Some("long running") {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.updates_before_cancel.store(true, Ordering::SeqCst);
                    return Ok(PromptResponse { stop_reason: StopReason::Cancelled });
                }
                _ = tokio::time::sleep(Duration::from_secs(30)) => {}
            }
            return Ok(PromptResponse { stop_reason: StopReason::EndTurn });
        }

        if args.prompt.first().and_then(ContentBlock::as_text) == Some("ask permission") {
            let outcome = self
                .client
                .request_permission(RequestPermissionRequest {
                    session_id: args.session_id.clone(),
                    tool_call: acp::ToolCallUpdate {
                        tool_call_id: acp::ToolCallId(Arc::from("tc-1")),
                        title: None,
                        kind: None,
                        status: None,
                        content: None,
                        locations: None,
                    },
                    options: vec![],
                })
                .await?;
            let stop_reason = match outcome.outcome {
                RequestPermissionOutcome::Allowed(_) => StopReason::EndTurn,
                RequestPermissionOutcome::Denied(_) => StopReason::Refusal,
            };
            return Ok(PromptResponse { stop_reason });
        }

        Ok(PromptResponse { stop_reason: StopReason::EndTurn })
    }

    async fn ext_method(&self, method: String, params: serde_json::Value) -> acp::Result<serde_json::Value> {
        if method == "x/ping" {
            return Ok(params);
        }
        Err(Error::MethodNotFound(method))
    }
}

struct TestClient {
    allow_permission: bool,
}

impl Client for TestClient {
    async fn request_permission(&self, _args: RequestPermissionRequest) -> acp::Result<RequestPermissionResponse> {
        let outcome = if self.allow_permission {
            RequestPermissionOutcome::Allowed(acp::AllowedOutcome { option_id: acp::PermissionOptionId(Arc::from("allow")) })
        } else {
            RequestPermissionOutcome::Denied(acp::DeniedOutcome {})
        };
        Ok(RequestPermissionResponse { outcome })
    }

    async fn read_text_file(&self, _args: ReadTextFileRequest) -> acp::Result<ReadTextFileResponse> {
        Ok(ReadTextFileResponse { content: "hello".into() })
    }

    async fn write_text_file(&self, _args: WriteTextFileRequest) -> acp::Result<WriteTextFileResponse> {
        Ok(WriteTextFileResponse {})
    }

    async fn session_notification(&self, notification: SessionNotification) {
        let _ = notification;
    }
}

fn wire_pair(
    prompt_calls: Arc<Mutex<u32>>,
    updates_before_cancel: Arc<AtomicBool>,
    allow_permission: bool,
) -> (ClientSideConnection, AgentSideConnection) {
    let (client_write, agent_read) = tokio::io::duplex(64 * 1024);
    let (agent_write, client_read) = tokio::io::duplex(64 * 1024);

    let agent = AgentSideConnection::new(
        move |conn| TestAgent { client: conn, prompt_calls, updates_before_cancel },
        agent_write,
        agent_read,
        ConnectionConfig::default(),
    );
    let client = ClientSideConnection::new(
        move |_conn| TestClient { allow_permission },
        client_write,
        client_read,
        ConnectionConfig::default(),
    );
    (client, agent)
}

// S1: initialize roundtrips the negotiated protocol version.
#[tokio::test]
async fn initialize_roundtrip() {
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), Arc::new(AtomicBool::new(false)), true);

    let response = client
        .initialize(InitializeRequest { protocol_version: acp::PROTOCOL_VERSION, client_capabilities: Default::default(), client_info: None })
        .await
        .unwrap();

    assert_eq!(response.protocol_version, acp::PROTOCOL_VERSION);
}

// S1 (wire-literal variant): the exact `initialize` payload with a literal
// `"clientCapabilities":null` must deserialize and succeed, not reject with
// invalid params.
#[tokio::test]
async fn initialize_with_explicit_null_client_capabilities_succeeds_over_the_wire() {
    let (test_writer, agent_read) = tokio::io::duplex(64 * 1024);
    let (agent_write, test_reader) = tokio::io::duplex(64 * 1024);

    let _agent = AgentSideConnection::new(
        |conn| TestAgent {
            client: conn,
            prompt_calls: Arc::new(Mutex::new(0)),
            updates_before_cancel: Arc::new(AtomicBool::new(false)),
        },
        agent_write,
        agent_read,
        ConnectionConfig::default(),
    );

    let mut writer = test_writer;
    let payload = br#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":1,"clientCapabilities":null}}"#;
    writer.write_all(payload).await.unwrap();
    writer.write_all(b"\n").await.unwrap();

    let mut lines = BufReader::new(test_reader).lines();
    let line = lines.next_line().await.unwrap().expect("agent sent a response line");
    let response: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert!(response.get("error").is_none(), "expected a success response, got {response}");
    assert_eq!(response["result"]["protocolVersion"], serde_json::json!(1));
}

// S2: a prompt that streams session/update chunks before responding.
#[tokio::test]
async fn streaming_prompt_delivers_chunks_before_completion() {
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), Arc::new(AtomicBool::new(false)), true);

    let response = client
        .prompt(PromptRequest { session_id: "session-1".into(), prompt: vec![ContentBlock::text("stream")] })
        .wait()
        .await
        .unwrap();

    assert_eq!(response.stop_reason, StopReason::EndTurn);
}

// S3: dropping a pending prompt sends session/cancel and the agent's
// CancelToken observes it before the 30s sleep would otherwise elapse.
#[tokio::test]
async fn dropping_pending_prompt_cancels_the_agents_turn() {
    let updates_before_cancel = Arc::new(AtomicBool::new(false));
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), updates_before_cancel.clone(), true);

    {
        let pending = client.prompt(PromptRequest { session_id: "session-1".into(), prompt: vec![ContentBlock::text("long running")] });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(pending);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(updates_before_cancel.load(Ordering::SeqCst));
}

// S4: the agent calls back into the client (request_permission) while
// handling an inbound prompt, interleaving both directions of traffic.
#[tokio::test]
async fn agent_calls_back_into_client_mid_prompt() {
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), Arc::new(AtomicBool::new(false)), true);

    let response = client
        .prompt(PromptRequest { session_id: "session-1".into(), prompt: vec![ContentBlock::text("ask permission")] })
        .wait()
        .await
        .unwrap();

    assert_eq!(response.stop_reason, StopReason::EndTurn);
}

// S5: malformed params surface as an invalid-params error, not a panic or a
// dropped connection.
#[tokio::test]
async fn invalid_params_surfaces_as_rpc_error() {
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), Arc::new(AtomicBool::new(false)), true);

    let result = client.ext_method("initialize", serde_json::json!(["not", "an", "object"])).await;
    assert!(result.is_err());
}

// S6: a method outside the catalog routes to ext_method instead of failing
// with method-not-found.
#[tokio::test]
async fn extension_method_round_trips() {
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), Arc::new(AtomicBool::new(false)), true);

    let result = client.ext_method("x/ping", serde_json::json!({"n": 7})).await.unwrap();
    assert_eq!(result, serde_json::json!({"n": 7}));
}

#[tokio::test]
async fn unknown_extension_method_is_rejected_by_default() {
    let (client, _agent) = wire_pair(Arc::new(Mutex::new(0)), Arc::new(AtomicBool::new(false)), true);

    let result = client.ext_method("x/unhandled", serde_json::Value::Null).await;
    assert!(result.is_err());
}
