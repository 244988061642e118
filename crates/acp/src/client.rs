//! The client-side role adapter: a trait describing the capability set a
//! client implements (serving file access and permission prompts, receiving
//! session updates), and a connection façade exposing the agent-directed
//! outbound calls (`initialize`, `authenticate`, session lifecycle,
//! `prompt`, `cancel`).

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
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

/// The capability set a client implements, driven by inbound requests and
/// notifications from the agent.
pub trait Client: Send + Sync + 'static {
    fn request_permission(&self, args: RequestPermissionRequest) -> impl Future<Output = Result<RequestPermissionResponse>> + Send;

    fn read_text_file(&self, args: ReadTextFileRequest) -> impl Future<Output = Result<ReadTextFileResponse>> + Send;

    fn write_text_file(&self, args: WriteTextFileRequest) -> impl Future<Output = Result<WriteTextFileResponse>> + Send;

    /// `session/update`: a streamed notification, no response expected.
    fn session_notification(&self, notification: SessionNotification) -> impl Future<Output = ()> + Send;

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

/// A cloneable handle to a client-side connection: the outbound half of the
/// adapter, calling into an agent process across the duplex transport.
pub struct ClientSideConnection {
    core: Arc<ConnectionCore>,
}

impl Clone for ClientSideConnection {
    fn clone(&self) -> Self {
        Self { core: self.core.clone() }
    }
}

impl ClientSideConnection {
    pub fn new<C, F, W, R>(to_client: F, outgoing: W, incoming: R, config: ConnectionConfig) -> Self
    where
        C: Client,
        F: FnOnce(ClientSideConnection) -> C,
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let core = ConnectionCore::new(outgoing, &config);
        let handle = Self { core: core.clone() };
        let client = Arc::new(to_client(handle.clone()));
        let dispatch = Arc::new(ClientDispatch { client });
        core.spawn_reader(incoming, dispatch, config.max_line_bytes);
        handle
    }

    pub async fn close(&self) {
        self.core.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    pub async fn initialize(&self, args: InitializeRequest) -> Result<InitializeResponse> {
        self.call(meta::METHOD_INITIALIZE, args).await
    }

    pub async fn authenticate(&self, args: AuthenticateRequest) -> Result<AuthenticateResponse> {
        self.call(meta::METHOD_AUTHENTICATE, args).await
    }

    pub async fn new_session(&self, args: NewSessionRequest) -> Result<NewSessionResponse> {
        self.call(meta::METHOD_SESSION_NEW, args).await
    }

    pub async fn load_session(&self, args: LoadSessionRequest) -> Result<LoadSessionResponse> {
        self.call(meta::METHOD_SESSION_LOAD, args).await
    }

    pub async fn set_session_mode(&self, args: SetSessionModeRequest) -> Result<SetSessionModeResponse> {
        self.call(meta::METHOD_SESSION_SET_MODE, args).await
    }

    /// Sends `session/prompt` and returns a handle that, if dropped before
    /// the response arrives, sends `session/cancel` for `session_id` so the
    /// agent can wind its turn down instead of working to a deaf peer.
    pub fn prompt(&self, args: PromptRequest) -> PendingPrompt {
        let session_id = args.session_id.clone();
        let core = self.core.clone();
        let params = serde_json::to_value(&args);
        let (settled_flag, join) = {
            let core = core.clone();
            let settled = Arc::new(AtomicBool::new(false));
            let settled_for_task = settled.clone();
            let handle = tokio::spawn(async move {
                let params = match params {
                    Ok(value) => value,
                    Err(source) => {
                        settled_for_task.store(true, Ordering::SeqCst);
                        return Err(Error::Serialize { method: meta::METHOD_SESSION_PROMPT, source });
                    }
                };
                let result = core.send_request(meta::METHOD_SESSION_PROMPT, params).await;
                settled_for_task.store(true, Ordering::SeqCst);
                let value = result?;
                serde_json::from_value(value).map_err(|source| Error::Deserialize {
                    context: "response",
                    method: meta::METHOD_SESSION_PROMPT.to_string(),
                    source,
                })
            });
            (settled, handle)
        };
        PendingPrompt { core, session_id, settled: settled_flag, join: Some(join) }
    }

    /// `session/cancel`: asks the agent to wind down the named session's
    /// current turn. Most callers should drop the [`PendingPrompt`] returned
    /// by [`ClientSideConnection::prompt`] instead of calling this directly.
    pub fn cancel(&self, session_id: SessionId) -> Result<()> {
        let params = serde_json::to_value(CancelNotification { session_id })
            .map_err(|source| Error::Serialize { method: meta::METHOD_SESSION_CANCEL, source })?;
        self.core.send_notification(meta::METHOD_SESSION_CANCEL, params)
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

/// A handle to an in-flight `session/prompt` call. Awaiting it behaves like
/// awaiting the response directly; dropping it before completion sends
/// `session/cancel` for its session so the agent learns the caller walked
/// away.
pub struct PendingPrompt {
    core: Arc<ConnectionCore>,
    session_id: SessionId,
    settled: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<Result<PromptResponse>>>,
}

impl PendingPrompt {
    pub async fn wait(mut self) -> Result<PromptResponse> {
        let join = self.join.take().expect("wait called at most once");
        match join.await {
            Ok(result) => result,
            Err(source) => Err(Error::Join(source)),
        }
    }

    /// Cancels this turn explicitly and waits for the agent's
    /// `StopReason::Cancelled` response (or whatever it settles with).
    pub async fn cancel_and_wait(self) -> Result<PromptResponse> {
        let _ = self.core.send_notification(meta::METHOD_SESSION_CANCEL, {
            serde_json::to_value(CancelNotification { session_id: self.session_id.clone() })
                .unwrap_or(serde_json::Value::Null)
        });
        self.wait().await
    }
}

impl Drop for PendingPrompt {
    fn drop(&mut self) {
        if self.settled.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(params) = serde_json::to_value(CancelNotification { session_id: self.session_id.clone() }) {
            let _ = self.core.send_notification(meta::METHOD_SESSION_CANCEL, params);
        }
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

struct ClientDispatch<C: Client> {
    client: Arc<C>,
}

impl<C: Client> InboundHandler for ClientDispatch<C> {
    fn handle_request(
        &self,
        method: String,
        params: Option<serde_json::Value>,
        _cancel: CancelToken,
    ) -> BoxFuture<'_, std::result::Result<serde_json::Value, RpcError>> {
        Box::pin(async move {
            let outcome = self.dispatch_request(&method, params).await;
            outcome.map_err(|err| err.to_rpc_error())
        })
    }

    fn handle_notification(&self, method: String, params: Option<serde_json::Value>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.dispatch_notification(&method, params).await;
        })
    }
}

impl<C: Client> ClientDispatch<C> {
    async fn dispatch_request(&self, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
        macro_rules! decode {
            ($ty:ty) => {
                decode_params::<$ty>(method, params)?
            };
        }

        if let Some(entry) = meta::client_method(method) {
            if entry.kind != meta::MethodKind::Request {
                return Err(Error::MethodNotFound(method.to_string()));
            }
        }

        let result = match method {
            m if m == meta::METHOD_SESSION_REQUEST_PERMISSION => {
                to_value(method, self.client.request_permission(decode!(RequestPermissionRequest)).await?)?
            }
            m if m == meta::METHOD_FS_READ_TEXT_FILE => {
                to_value(method, self.client.read_text_file(decode!(ReadTextFileRequest)).await?)?
            }
            m if m == meta::METHOD_FS_WRITE_TEXT_FILE => {
                to_value(method, self.client.write_text_file(decode!(WriteTextFileRequest)).await?)?
            }
            _ => {
                let raw = params.unwrap_or(serde_json::Value::Null);
                to_value(method, self.client.ext_method(method.to_string(), raw).await?)?
            }
        };
        Ok(result)
    }

    async fn dispatch_notification(&self, method: &str, params: Option<serde_json::Value>) {
        if let Some(entry) = meta::client_method(method) {
            if entry.kind != meta::MethodKind::Notification {
                debug!("acp notification for request-only method {method}, ignoring");
                return;
            }
        }

        match method {
            m if m == meta::METHOD_SESSION_UPDATE => {
                let Ok(args) = decode_params::<SessionNotification>(method, params) else { return };
                self.client.session_notification(args).await;
            }
            _ => {
                let raw = params.unwrap_or(serde_json::Value::Null);
                self.client.ext_notification(method.to_string(), raw).await;
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
