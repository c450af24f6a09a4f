//
// Copyright 2024-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Sink, SinkExt as _, Stream, StreamExt as _};
use http::StatusCode;
use prost::Message as _;
use tokio::sync::{mpsc, oneshot};

use crate::chat::{
    ChatMessageType, MessageProto, Request, RequestProto, Response, ResponseProto, SendError,
};

/// Chat service available over a connected websocket.
///
/// This is backed by a [`tokio`] task that owns the transport. Requests are
/// framed and handed to the task, and each response is routed back to its
/// waiter by request ID. Requests initiated by the server are forwarded to the
/// listener channel given at construction.
pub struct ChatConnection {
    outgoing_tx: mpsc::UnboundedSender<Bytes>,
    requests_in_flight: Arc<Mutex<InFlightRequests>>,
    next_request_id: AtomicU64,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    log_tag: Arc<str>,
}

/// Instantiation-time configuration for a [`ChatConnection`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// The value to use as the ID for the first outgoing request.
    pub initial_request_id: u64,
}

/// A request sent by the server, along with the means to acknowledge it.
#[derive(Debug)]
pub struct ServerRequest {
    pub request: RequestProto,
    pub responder: Responder,
}

/// Sends the response to one [`ServerRequest`].
#[derive(Debug)]
pub struct Responder {
    id: u64,
    /// Weak so that unanswered server requests don't hold the connection open.
    tx: mpsc::WeakUnboundedSender<Bytes>,
}

/// Why the backing task stopped.
#[derive(Debug, displaydoc::Display)]
enum FinishReason {
    /// closed locally
    LocalDisconnect,
    /// the server closed the stream
    RemoteDisconnect,
    /// failed to send: {0}
    SendFailed(std::io::ErrorKind),
    /// failed to receive: {0}
    ReceiveFailed(std::io::ErrorKind),
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
struct RequestId(u64);

#[derive(Default)]
struct InFlightRequests {
    outstanding_reqs: HashMap<RequestId, oneshot::Sender<Result<Response, SendError>>>,
    /// Set once the task has exited; no new requests may be recorded after that.
    closed: bool,
}

#[derive(Debug, displaydoc::Display)]
pub(super) enum ChatProtoDataError {
    /// protobuf decode failed: {0}
    InvalidProtobuf(prost::DecodeError),
    /// unrecognized message type {0}
    InvalidMessageType(i32),
    /// request-type message has response value
    RequestHasResponse,
    /// response-type messages has request value
    ResponseHasRequest,
    /// message type was unknown
    UnknownMessageType,
    /// message was missing payload
    MissingPayload,
}

#[derive(Debug)]
pub(super) enum ChatMessageProto {
    Request(RequestProto),
    Response(ResponseProto),
}

/// The eventual response to a request sent with [`ChatConnection::send_correlated`].
///
/// Dropping this before it resolves abandons the request: its ID is unregistered and any
/// response that arrives later is discarded.
#[must_use = "dropping the pending response abandons the request"]
pub struct PendingResponse {
    id: RequestId,
    rx: oneshot::Receiver<Result<Response, SendError>>,
    requests_in_flight: Arc<Mutex<InFlightRequests>>,
}

impl ChatConnection {
    /// Starts the backing task on `tokio_runtime` and returns a handle to it.
    ///
    /// `incoming` yields binary frames from the server and `outgoing` accepts
    /// frames for it. The task runs until either side fails, the server closes
    /// the stream, or the connection is [disconnected](Self::disconnect).
    pub fn start<S, K>(
        tokio_runtime: &tokio::runtime::Handle,
        incoming: S,
        outgoing: K,
        config: Config,
        listener: mpsc::UnboundedSender<ServerRequest>,
        log_tag: Arc<str>,
    ) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static,
        K: Sink<Bytes, Error = std::io::Error> + Send + Unpin + 'static,
    {
        let Config { initial_request_id } = config;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let requests_in_flight = Arc::new(Mutex::new(InFlightRequests::default()));

        let task = ConnectionTask {
            requests_in_flight: requests_in_flight.clone(),
            responder_tx: outgoing_tx.downgrade(),
            listener,
            log_tag: log_tag.clone(),
        };
        tokio_runtime.spawn(task.run(incoming, outgoing, outgoing_rx, shutdown_rx));

        Self {
            outgoing_tx,
            requests_in_flight,
            next_request_id: AtomicU64::new(initial_request_id),
            shutdown: Mutex::new(Some(shutdown_tx)),
            log_tag,
        }
    }

    /// Sends `request` and returns a handle for its response.
    ///
    /// The request is registered before it is written, so a response can never
    /// arrive ahead of its waiter.
    pub fn send_correlated(&self, request: Request) -> Result<PendingResponse, SendError> {
        // Wrapping is fine: an ID is only reused after 2^64 requests.
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let frame = MessageProto::from(ChatMessageProto::Request(request.into_proto(id)?))
            .encode_to_vec()
            .into();

        let (response_tx, response_rx) = oneshot::channel();
        self.requests_in_flight
            .lock()
            .expect("not poisoned")
            .record_send(RequestId(id), response_tx)?;
        let pending = PendingResponse {
            id: RequestId(id),
            rx: response_rx,
            requests_in_flight: self.requests_in_flight.clone(),
        };

        // If the task already exited, dropping `pending` unregisters the request.
        self.outgoing_tx
            .send(frame)
            .map_err(|_| SendError::Disconnected)?;
        log::debug!("[{}] sent request {id}", self.log_tag);
        Ok(pending)
    }

    /// Sends `request` and waits for its response, for at most `timeout` if one is given.
    pub async fn send(
        &self,
        request: Request,
        timeout: Option<Duration>,
    ) -> Result<Response, SendError> {
        let pending = self.send_correlated(request)?;
        match timeout {
            None => pending.await,
            Some(timeout) => tokio::time::timeout(timeout, pending)
                .await
                .map_err(|_elapsed| SendError::RequestTimedOut)?,
        }
    }

    /// Asks the backing task to stop.
    ///
    /// Requests still waiting for a response fail with [`SendError::Disconnected`].
    pub fn disconnect(&self) {
        if let Some(shutdown) = self.shutdown.lock().expect("not poisoned").take() {
            let _ignore_already_finished = shutdown.send(());
        }
    }

    /// Whether the backing task is still running.
    pub fn is_connected(&self) -> bool {
        !self.requests_in_flight.lock().expect("not poisoned").closed
    }
}

impl Future for PendingResponse {
    type Output = Result<Response, SendError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(SendError::Disconnected)))
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        // A no-op if the response was already delivered.
        self.requests_in_flight
            .lock()
            .expect("not poisoned")
            .abandon(self.id);
    }
}

impl Responder {
    /// Sends a response for the associated request to the server.
    ///
    /// Fails if the server definitely didn't receive the response. A return
    /// value of `Ok(())` does not guarantee that the server received the
    /// response.
    pub fn send_response(self, status: StatusCode) -> Result<(), SendError> {
        let Self { id, tx } = self;
        let response = ResponseProto {
            id: Some(id),
            status: Some(status.as_u16().into()),
            message: status.canonical_reason().map(ToOwned::to_owned),
            headers: vec![],
            body: None,
        };
        let frame = MessageProto::from(ChatMessageProto::Response(response))
            .encode_to_vec()
            .into();
        tx.upgrade()
            .and_then(|tx| tx.send(frame).ok())
            .ok_or(SendError::Disconnected)
    }
}

impl InFlightRequests {
    fn record_send(
        &mut self,
        id: RequestId,
        response_sender: oneshot::Sender<Result<Response, SendError>>,
    ) -> Result<(), SendError> {
        if self.closed {
            return Err(SendError::Disconnected);
        }
        let prev = self.outstanding_reqs.insert(id, response_sender);
        assert!(
            prev.is_none(),
            "tried to send a second request with ID {id}",
            id = id.0
        );
        Ok(())
    }

    fn finish_send(&mut self, id: RequestId, result: Result<Response, SendError>, log_tag: &str) {
        if let Some(sender) = self.outstanding_reqs.remove(&id) {
            let _ignore_send_error = sender.send(result);
        } else {
            // Either the waiter gave up or the server is confused.
            log::warn!(
                "[{log_tag}] got response to unknown or abandoned request {}",
                id.0
            );
        }
    }

    fn abandon(&mut self, id: RequestId) {
        self.outstanding_reqs.remove(&id);
    }

    /// Fails every outstanding request and refuses new ones.
    fn close(&mut self) -> usize {
        self.closed = true;
        let outstanding = self.outstanding_reqs.len();
        // Dropping the senders resolves each waiter with `Disconnected`.
        self.outstanding_reqs.clear();
        outstanding
    }
}

struct ConnectionTask {
    requests_in_flight: Arc<Mutex<InFlightRequests>>,
    responder_tx: mpsc::WeakUnboundedSender<Bytes>,
    listener: mpsc::UnboundedSender<ServerRequest>,
    log_tag: Arc<str>,
}

impl ConnectionTask {
    async fn run<S, K>(
        self,
        mut incoming: S,
        mut outgoing: K,
        mut outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
        K: Sink<Bytes, Error = std::io::Error> + Unpin,
    {
        let log_tag = &self.log_tag;
        let reason = loop {
            tokio::select! {
                _ = &mut shutdown_rx => break FinishReason::LocalDisconnect,
                frame = outgoing_rx.recv() => {
                    let Some(frame) = frame else {
                        break FinishReason::LocalDisconnect;
                    };
                    if let Err(e) = outgoing.send(frame).await {
                        break FinishReason::SendFailed(e.kind());
                    }
                }
                frame = incoming.next() => match frame {
                    None => break FinishReason::RemoteDisconnect,
                    Some(Err(e)) => break FinishReason::ReceiveFailed(e.kind()),
                    Some(Ok(frame)) => self.handle_incoming(&frame),
                },
            }
        };

        let abandoned = self
            .requests_in_flight
            .lock()
            .expect("not poisoned")
            .close();
        log::info!("[{log_tag}] connection finished ({reason}); {abandoned} requests failed");
        let _ignore_close_error = outgoing.close().await;
    }

    fn handle_incoming(&self, frame: &[u8]) {
        let log_tag = &self.log_tag;
        let message = match decode_and_validate(frame) {
            Ok(message) => message,
            Err(e) => {
                log::error!("[{log_tag}] dropping invalid frame: {e}");
                return;
            }
        };
        match message {
            ChatMessageProto::Response(response) => {
                let Some(id) = response.id.map(RequestId) else {
                    log::error!("[{log_tag}] response had no ID");
                    return;
                };
                let result = Response::try_from(response);
                if result.is_err() {
                    log::warn!("[{log_tag}] invalid response for request {}", id.0);
                }
                self.requests_in_flight
                    .lock()
                    .expect("not poisoned")
                    .finish_send(id, result, log_tag);
            }
            ChatMessageProto::Request(request) => {
                let Some(id) = request.id else {
                    log::error!("[{log_tag}] request had no ID");
                    return;
                };
                let responder = Responder {
                    id,
                    tx: self.responder_tx.clone(),
                };
                if self
                    .listener
                    .send(ServerRequest { request, responder })
                    .is_err()
                {
                    log::warn!("[{log_tag}] no listener for server request {id}");
                }
            }
        }
    }
}

impl From<ChatMessageProto> for MessageProto {
    fn from(value: ChatMessageProto) -> Self {
        let (type_, request, response) = match value {
            ChatMessageProto::Request(request) => (ChatMessageType::Request, Some(request), None),
            ChatMessageProto::Response(response) => {
                (ChatMessageType::Response, None, Some(response))
            }
        };
        MessageProto {
            r#type: Some(type_.into()),
            request,
            response,
        }
    }
}

pub(super) fn decode_and_validate(data: &[u8]) -> Result<ChatMessageProto, ChatProtoDataError> {
    let msg = MessageProto::decode(data).map_err(ChatProtoDataError::InvalidProtobuf)?;
    let MessageProto {
        r#type,
        request,
        response,
    } = msg;

    let message_type = ChatMessageType::try_from(r#type.unwrap_or_default())
        .map_err(|e| ChatProtoDataError::InvalidMessageType(e.0))?;

    match (message_type, request, response) {
        (ChatMessageType::Unknown, _, _) => Err(ChatProtoDataError::UnknownMessageType),
        (ChatMessageType::Request, Some(req), None) => Ok(ChatMessageProto::Request(req)),
        (ChatMessageType::Response, None, Some(res)) => Ok(ChatMessageProto::Response(res)),

        (ChatMessageType::Request, None, None) | (ChatMessageType::Response, None, None) => {
            Err(ChatProtoDataError::MissingPayload)
        }
        (ChatMessageType::Request, _, Some(_)) => Err(ChatProtoDataError::RequestHasResponse),
        (ChatMessageType::Response, Some(_), _) => Err(ChatProtoDataError::ResponseHasRequest),
    }
}
