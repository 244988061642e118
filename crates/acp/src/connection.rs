//! The peer connection: owns the framer, the pending/inbound request
//! tables, and the serialized writer, and exposes the symmetric
//! send-request / send-notification / receive-request API described by the
//! connection and dispatcher design. Generalizes the teacher's
//! `JsonRpcTransport` (`mcp/jsonrpc.rs`) — an unbounded mpsc-backed writer
//! task plus a reader task holding the only `PendingRequests` table — to a
//! bidirectional peer where either side may also receive requests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result, RpcError};
use crate::framer::{FrameReader, FrameWriter};
use crate::wire::{Classification, Envelope, RequestId};

/// A future-backed alias for a handler's response, boxed so
/// [`InboundHandler`] can remain dyn-free but still be driven from a
/// `tokio::spawn`ed reader loop without pulling in an async-trait macro.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A cooperative cancellation signal handed to an inbound request handler.
///
/// Unlike a `tokio_util::sync::CancellationToken`, this is hand-rolled from
/// an `AtomicBool` and a `Notify` so the crate doesn't need to pull in
/// `tokio-util` for a single primitive.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)), notify: Arc::new(Notify::new()) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once [`CancelToken::cancel`] has been called, or immediately
    /// if it already has been.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The four-way inbound routing surface a role adapter implements: requests
/// get a response, notifications don't. Both receive a back-reference is
/// unnecessary here because adapters close over their own connection handle.
pub trait InboundHandler: Send + Sync + 'static {
    fn handle_request(
        &self,
        method: String,
        params: Option<serde_json::Value>,
        cancel: CancelToken,
    ) -> BoxFuture<'_, std::result::Result<serde_json::Value, RpcError>>;

    fn handle_notification(&self, method: String, params: Option<serde_json::Value>) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum State {
    Open = 0,
    Running = 1,
    Closing = 2,
    Closed = 3,
}

impl State {
    fn from_u8(value: u8) -> State {
        match value {
            0 => State::Open,
            1 => State::Running,
            2 => State::Closing,
            _ => State::Closed,
        }
    }
}

type PendingTable = Arc<Mutex<HashMap<RequestId, oneshot::Sender<std::result::Result<serde_json::Value, RpcError>>>>>;
type InboundTable = Arc<Mutex<HashMap<RequestId, CancelToken>>>;

/// The generic half of a peer connection: framing, id allocation, the
/// pending/inbound tables, and the serialized writer. Role adapters
/// (`AgentSideConnection`, `ClientSideConnection`) wrap this and add typed
/// outbound methods plus an [`InboundHandler`] that decodes the method
/// catalog for their side.
pub struct ConnectionCore {
    writer: mpsc::UnboundedSender<Envelope>,
    pending: PendingTable,
    inbound: InboundTable,
    next_id: AtomicU64,
    state: AtomicU8,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionCore {
    pub fn new<W>(outgoing: W, config: &ConnectionConfig) -> Arc<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(writer_loop(FrameWriter::new(outgoing), writer_rx));

        let _ = config;
        Arc::new(Self {
            writer: writer_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            inbound: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            state: AtomicU8::new(State::Open as u8),
            tasks: Mutex::new(vec![writer_task]),
        })
    }

    /// Starts the reader loop against `incoming`, dispatching every inbound
    /// envelope to `handler`. Only one reader may be spawned per core.
    pub fn spawn_reader<R, H>(self: &Arc<Self>, incoming: R, handler: Arc<H>, max_line_bytes: usize)
    where
        R: AsyncRead + Send + Unpin + 'static,
        H: InboundHandler,
    {
        self.state.store(State::Running as u8, Ordering::SeqCst);
        let core = self.clone();
        let handle = tokio::spawn(reader_loop(core, FrameReader::new(incoming, max_line_bytes), handler));
        // `try_lock` is safe here: nothing else touches `tasks` synchronously
        // at construction time, and this runs before the core is returned to
        // the caller.
        if let Ok(mut tasks) = self.tasks.try_lock() {
            tasks.push(handle);
        }
    }

    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn send_envelope(&self, envelope: Envelope) -> Result<()> {
        self.writer.send(envelope).map_err(|_| Error::Closed)
    }

    /// Sends a request and returns the raw JSON result once the peer
    /// responds, or a closed/cancellation error. Role adapters layer typed
    /// (de)serialization and, for cancellable calls, drop-triggered
    /// cancellation notifications on top of this.
    pub async fn send_request(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if self.state() != State::Open && self.state() != State::Running {
            return Err(Error::Closed);
        }
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if self.send_envelope(Envelope::request(id.clone(), method, params)).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(Error::Closed);
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Error::Peer(err)),
            Err(_) => Err(Error::Closed),
        }
    }

    pub fn send_notification(&self, method: &'static str, params: serde_json::Value) -> Result<()> {
        if self.state() == State::Closed || self.state() == State::Closing {
            return Err(Error::Closed);
        }
        self.send_envelope(Envelope::notification(method, params))
    }

    /// Allocates an id and fires the request without waiting for a
    /// response, handing the id back so the caller (a cancellable outbound
    /// call wrapper) can register its own pending slot and cancellation
    /// bookkeeping.
    pub(crate) async fn send_request_tracked(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<(RequestId, oneshot::Receiver<std::result::Result<serde_json::Value, RpcError>>)> {
        if self.state() != State::Open && self.state() != State::Running {
            return Err(Error::Closed);
        }
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);
        if self.send_envelope(Envelope::request(id.clone(), method, params)).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(Error::Closed);
        }
        Ok((id, rx))
    }

    pub(crate) async fn forget_pending(&self, id: &RequestId) {
        self.pending.lock().await.remove(id);
    }

    /// Drains the writer, fails every pending outbound call with a closed
    /// error, and moves the connection to its terminal state.
    pub async fn close(&self) {
        self.state.store(State::Closing as u8, Ordering::SeqCst);
        let mut pending = self.pending.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(RpcError::internal("connection closed")));
        }
        drop(pending);
        for token in self.inbound.lock().await.values() {
            token.cancel();
        }
        self.state.store(State::Closed as u8, Ordering::SeqCst);
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == State::Closed
    }
}

async fn writer_loop(mut writer: FrameWriter<impl AsyncWrite + Unpin>, mut rx: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        if let Err(err) = writer.write_envelope(&envelope).await {
            warn!("acp writer closing after framing error: {err}");
            break;
        }
    }
}

async fn reader_loop<R, H>(core: Arc<ConnectionCore>, mut reader: FrameReader<R>, handler: Arc<H>)
where
    R: AsyncRead + Send + Unpin + 'static,
    H: InboundHandler,
{
    loop {
        let envelope = match reader.next_envelope().await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => break,
            Err(err) => {
                warn!("acp reader resynchronizing after framing error: {err}");
                continue;
            }
        };

        match envelope.classify() {
            Classification::Request => {
                let id = envelope.id.clone().expect("request envelopes carry an id");
                let method = envelope.method.clone().expect("request envelopes carry a method");
                let token = CancelToken::new();
                core.inbound.lock().await.insert(id.clone(), token.clone());

                let core = core.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    // Spawned on its own task so a panicking handler is
                    // caught by tokio's unwind isolation instead of taking
                    // down this bookkeeping task with it — every request
                    // still gets exactly one response envelope.
                    let join = tokio::spawn(async move { handler.handle_request(method, envelope.params, token).await });
                    let outcome = match join.await {
                        Ok(outcome) => outcome,
                        Err(join_err) => {
                            warn!("acp handler panicked for request {id}: {join_err}");
                            Err(RpcError::internal("handler panicked"))
                        }
                    };
                    core.inbound.lock().await.remove(&id);
                    let response = match outcome {
                        Ok(result) => Envelope::response(id, result),
                        Err(rpc_error) => Envelope::error_response(id, rpc_error),
                    };
                    let _ = core.send_envelope(response);
                });
            }
            Classification::Notification => {
                let method = envelope.method.clone().expect("notification envelopes carry a method");
                debug!("acp notification: {method}");
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.handle_notification(method, envelope.params).await;
                });
            }
            Classification::Response => {
                let id = envelope.id.clone().expect("response envelopes carry an id");
                let mut pending = core.pending.lock().await;
                let Some(tx) = pending.remove(&id) else {
                    debug!("acp response for unknown or already-resolved id {id}, discarding");
                    continue;
                };
                drop(pending);
                let outcome = match (envelope.result, envelope.error) {
                    (_, Some(error)) => Err(error),
                    (Some(result), None) => Ok(result),
                    (None, None) => Ok(serde_json::Value::Null),
                };
                let _ = tx.send(outcome);
            }
            Classification::Malformed => {
                warn!("acp received malformed envelope, discarding");
            }
        }
    }

    let mut pending = core.pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(RpcError::internal("connection closed")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    struct EchoHandler;

    impl InboundHandler for EchoHandler {
        fn handle_request(
            &self,
            _method: String,
            params: Option<serde_json::Value>,
            _cancel: CancelToken,
        ) -> BoxFuture<'_, std::result::Result<serde_json::Value, RpcError>> {
            Box::pin(async move { Ok(params.unwrap_or(serde_json::Value::Null)) })
        }

        fn handle_notification(&self, _method: String, _params: Option<serde_json::Value>) -> BoxFuture<'_, ()> {
            Box::pin(async move {})
        }
    }

    #[tokio::test]
    async fn request_response_roundtrips_through_two_cores() {
        let (a_write, b_read) = duplex(4096);
        let (b_write, a_read) = duplex(4096);
        let config = ConnectionConfig::default();

        let a = ConnectionCore::new(a_write, &config);
        a.spawn_reader(a_read, Arc::new(EchoHandler), config.max_line_bytes);
        let b = ConnectionCore::new(b_write, &config);
        b.spawn_reader(b_read, Arc::new(EchoHandler), config.max_line_bytes);

        let result = a.send_request("ping", serde_json::json!({"x": 1})).await.unwrap();
        assert_eq!(result, serde_json::json!({"x": 1}));
    }

    struct PanickingHandler;

    impl InboundHandler for PanickingHandler {
        fn handle_request(
            &self,
            _method: String,
            _params: Option<serde_json::Value>,
            _cancel: CancelToken,
        ) -> BoxFuture<'_, std::result::Result<serde_json::Value, RpcError>> {
            Box::pin(async move { panic!("handler exploded") })
        }

        fn handle_notification(&self, _method: String, _params: Option<serde_json::Value>) -> BoxFuture<'_, ()> {
            Box::pin(async move {})
        }
    }

    #[tokio::test]
    async fn panicking_handler_still_yields_one_error_response() {
        let (a_write, b_read) = duplex(4096);
        let (b_write, a_read) = duplex(4096);
        let config = ConnectionConfig::default();

        let a = ConnectionCore::new(a_write, &config);
        a.spawn_reader(a_read, Arc::new(EchoHandler), config.max_line_bytes);
        let b = ConnectionCore::new(b_write, &config);
        b.spawn_reader(b_read, Arc::new(PanickingHandler), config.max_line_bytes);

        let result = a.send_request("boom", serde_json::Value::Null).await;
        let err = result.unwrap_err();
        match err {
            Error::Peer(rpc_error) => assert_eq!(rpc_error.code, crate::error::INTERNAL_ERROR),
            other => panic!("expected a peer error, got {other:?}"),
        }
        assert!(b.inbound.lock().await.is_empty());
    }

    #[tokio::test]
    async fn close_fails_pending_requests() {
        let (a_write, _b_read) = duplex(4096);
        let config = ConnectionConfig::default();
        let a = ConnectionCore::new(a_write, &config);

        let (id, rx) = a.send_request_tracked("slow", serde_json::Value::Null).await.unwrap();
        a.close().await;
        let _ = id;
        let outcome = rx.await;
        assert!(outcome.unwrap().is_err());
    }
}
