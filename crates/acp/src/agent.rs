//! The agent-side role adapter: a trait describing the capability set an
//! agent implements (`initialize`, `authenticate`, `new_session`,
//! `load_session`, `set_session_mode`, `prompt`, `cancel`, plus the
//! extension hooks), and a connection façade that binds it to inbound
//! dispatch while exposing the client-directed outbound calls
//! (`session_update`, `request_permission`, `read_text_file`,
//! `write_text_file`).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::{BoxFuture, CancelToken, ConnectionCore, InboundHandler};
use crate::error::{Error, Result, RpcError};
use crate::meta;
use crate::schema::{
    AuthenticateRequest, AuthenticateResponse, CancelNotification, InitializeRequest,
    InitializeResponse, LoadSessionRequest, LoadSessionResponse, NewSessionRequest,
    NewSessionResponse, PromptRequest, PromptResponse, ReadTextFileRequest, ReadTextFileResponse,
    RequestPermissionRequest, RequestPermissionResponse, SessionId, SessionNotification,
    SetSessionModeRequest, SetSessionModeResponse, WriteTextFileRequest, WriteTextFileResponse,
};

/// The capability set an agent implements, driven by inbound requests from
/// the client. Implementors never see raw JSON-RPC; the adapter decodes the
/// method catalog and routes into these methods.
pub trait Agent: Send + Sync + 'static {
    fn initialize(&self, args: InitializeRequest) -> impl Future<Output = Result<InitializeResponse>> + Send;

    fn authenticate(&self, args: AuthenticateRequest) -> impl Future<Output = Result<AuthenticateResponse>> + Send {
        async move {
            let _ = args;
            Ok(AuthenticateResponse::default())
        }
    }

    fn new_session(&self, args: NewSessionRequest) -> impl Future<Output = Result<NewSessionResponse>> + Send;

    fn load_session(&self, args: LoadSessionRequest) -> impl Future<Output = Result<LoadSessionResponse>> + Send {
        async move {
            let _ = args;
            Ok(LoadSessionResponse::default())
        }
    }

    fn set_session_mode(&self, args: SetSessionModeRequest) -> impl Future<Output = Result<SetSessionModeResponse>> + Send {
        async move {
            let _ = args;
            Ok(SetSessionModeResponse::default())
        }
    }

    /// Handles a prompt turn. `cancel` resolves once the client cancels this
    /// session's turn via `session/cancel`; implementations should poll it
    /// (e.g. with `tokio::select!`) between streamed updates and return
    /// promptly with `StopReason::Cancelled` once it fires.
    fn prompt(&self, args: PromptRequest, cancel: CancelToken) -> impl Future<Output = Result<PromptResponse>> + Send;

    /// Notification only; the prompt handler observes cancellation through
    /// the token it was handed, not through this hook directly.
    fn cancel(&self, args: CancelNotification) -> impl Future<Output = ()> + Send {
        async move {
            let _ = args;
        }
    }

    fn ext_method(&self, method: String, params: serde_json::Value) -> impl Future<Output = Result<serde_json::Value>> + Send {
        async move {
            let _ = params;
            Err(Error::MethodNotFound(method))
        }
    }

    fn ext_notification(&self, method: String, params: serde_json::Value) -> impl Future<Output = ()> + Send {
        async move {
            let _ = (method, params);
        }
    }
}

/// A cloneable handle to an agent-side connection: the outbound half of the
/// adapter, usable both by library callers and by an `Agent` implementation
/// that was handed one at construction time (mirroring the Python
/// reference's `AgentSideConnection(lambda conn: MyAgent(conn), ...)`).
pub struct AgentSideConnection {
    core: Arc<ConnectionCore>,
    max_line_bytes: usize,
}

impl Clone for AgentSideConnection {
    fn clone(&self) -> Self {
        Self { core: self.core.clone(), max_line_bytes: self.max_line_bytes }
    }
}

impl AgentSideConnection {
    /// Constructs the connection and, before the reader loop starts, hands a
    /// cloned handle to `to_agent` so the agent can make outbound calls from
    /// within its own request handlers.
    pub fn new<A, F, W, R>(to_agent: F, outgoing: W, incoming: R, config: ConnectionConfig) -> Self
    where
        A: Agent,
        F: FnOnce(AgentSideConnection) -> A,
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let core = ConnectionCore::new(outgoing, &config);
        let handle = Self { core: core.clone(), max_line_bytes: config.max_line_bytes };
        let agent = Arc::new(to_agent(handle.clone()));
        let dispatch = Arc::new(AgentDispatch { agent, active_prompts: Mutex::new(HashMap::new()) });
        core.spawn_reader(incoming, dispatch, config.max_line_bytes);
        handle
    }

    pub async fn close(&self) {
        self.core.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// `session/update`: streams a chunk of agent output, a tool-call
    /// lifecycle event, or a plan to the client.
    pub fn session_update(&self, notification: SessionNotification) -> Result<()> {
        let params = serde_json::to_value(&notification)
            .map_err(|source| Error::Serialize { method: meta::METHOD_SESSION_UPDATE, source })?;
        self.core.send_notification(meta::METHOD_SESSION_UPDATE, params)
    }

    pub async fn request_permission(&self, args: RequestPermissionRequest) -> Result<RequestPermissionResponse> {
        self.call(meta::METHOD_SESSION_REQUEST_PERMISSION, args).await
    }

    pub async fn read_text_file(&self, args: ReadTextFileRequest) -> Result<ReadTextFileResponse> {
        self.call(meta::METHOD_FS_READ_TEXT_FILE, args).await
    }

    pub async fn write_text_file(&self, args: WriteTextFileRequest) -> Result<WriteTextFileResponse> {
        self.call(meta::METHOD_FS_WRITE_TEXT_FILE, args).await
    }

    pub async fn ext_method(&self, method: &'static str, params: serde_json::Value) -> Result<serde_json::Value> {
        self.core.send_request(method, params).await
    }

    pub fn ext_notification(&self, method: &'static str, params: serde_json::Value) -> Result<()> {
        self.core.send_notification(method, params)
    }

    async fn call<P, Res>(&self, method: &'static str, args: P) -> Result<Res>
    where
        P: serde::Serialize,
        Res: serde::de::DeserializeOwned,
    {
        let params = serde_json::to_value(&args).map_err(|source| Error::Serialize { method, source })?;
        let result = self.core.send_request(method, params).await?;
        serde_json::from_value(result)
            .map_err(|source| Error::Deserialize { context: "response", method: method.to_string(), source })
    }
}

struct AgentDispatch<A: Agent> {
    agent: Arc<A>,
    active_prompts: Mutex<HashMap<SessionId, CancelToken>>,
}

impl<A: Agent> InboundHandler for AgentDispatch<A> {
    fn handle_request(
        &self,
        method: String,
        params: Option<serde_json::Value>,
        cancel: CancelToken,
    ) -> BoxFuture<'_, std::result::Result<serde_json::Value, RpcError>> {
        Box::pin(async move {
            let outcome = self.dispatch_request(&method, params, cancel).await;
            outcome.map_err(|err| err.to_rpc_error())
        })
    }

    fn handle_notification(&self, method: String, params: Option<serde_json::Value>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.dispatch_notification(&method, params).await;
        })
    }
}

impl<A: Agent> AgentDispatch<A> {
    async fn dispatch_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        cancel: CancelToken,
    ) -> Result<serde_json::Value> {
        macro_rules! decode {
            ($ty:ty) => {
                decode_params::<$ty>(method, params)?
            };
        }

        if let Some(entry) = meta::agent_method(method) {
            if entry.kind != meta::MethodKind::Request {
                return Err(Error::MethodNotFound(method.to_string()));
            }
        }

        let result = match method {
            m if m == meta::METHOD_INITIALIZE => to_value(method, self.agent.initialize(decode!(InitializeRequest)).await?)?,
            m if m == meta::METHOD_AUTHENTICATE => to_value(method, self.agent.authenticate(decode!(AuthenticateRequest)).await?)?,
            m if m == meta::METHOD_SESSION_NEW => to_value(method, self.agent.new_session(decode!(NewSessionRequest)).await?)?,
            m if m == meta::METHOD_SESSION_LOAD => to_value(method, self.agent.load_session(decode!(LoadSessionRequest)).await?)?,
            m if m == meta::METHOD_SESSION_SET_MODE => to_value(method, self.agent.set_session_mode(decode!(SetSessionModeRequest)).await?)?,
            m if m == meta::METHOD_SESSION_PROMPT => {
                let args: PromptRequest = decode!(PromptRequest);
                let session_id = args.session_id.clone();
                self.active_prompts.lock().await.insert(session_id.clone(), cancel.clone());
                let response = self.agent.prompt(args, cancel).await;
                self.active_prompts.lock().await.remove(&session_id);
                to_value(method, response?)?
            }
            _ => {
                let raw = params.unwrap_or(serde_json::Value::Null);
                to_value(method, self.agent.ext_method(method.to_string(), raw).await?)?
            }
        };
        Ok(result)
    }

    async fn dispatch_notification(&self, method: &str, params: Option<serde_json::Value>) {
        if let Some(entry) = meta::agent_method(method) {
            if entry.kind != meta::MethodKind::Notification {
                debug!("acp notification for request-only method {method}, ignoring");
                return;
            }
        }

        match method {
            m if m == meta::METHOD_SESSION_CANCEL => {
                let Ok(args) = decode_params::<CancelNotification>(method, params) else { return };
                if let Some(token) = self.active_prompts.lock().await.get(&args.session_id) {
                    token.cancel();
                }
            }
            _ => {
                let raw = params.unwrap_or(serde_json::Value::Null);
                self.agent.ext_notification(method.to_string(), raw).await;
            }
        }
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(method: &str, params: Option<serde_json::Value>) -> Result<T> {
    let value = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value)
        .map_err(|source| Error::Deserialize { context: "params", method: method.to_string(), source })
}

fn to_value<T: serde::Serialize>(method: &str, value: T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|source| Error::Deserialize {
        context: "result",
        method: method.to_string(),
        source,
    })
}
