//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use bytes::Bytes;
use prost::Message;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::chat::ws::{self, ChatMessageProto};
use crate::chat::{ChatConnection, ChatMessageType, MessageProto, RequestProto, ResponseProto};

/// The remote end of a fake connection to the chat server.
#[derive(Debug)]
pub struct FakeChatRemote {
    tx: mpsc::UnboundedSender<std::io::Result<Bytes>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

/// Error returned when a send fails because the client end has finished.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Disconnected;

/// Error returned when a receive fails because the frame is not what was expected.
#[derive(Debug)]
pub enum ReceiveRequestError {
    InvalidProto(String),
    GotRequest,
    GotResponse,
}

impl ChatConnection {
    /// Creates a `ChatConnection` connected to a fake remote end.
    pub fn new_fake(
        tokio_runtime: &tokio::runtime::Handle,
        listener: mpsc::UnboundedSender<ws::ServerRequest>,
    ) -> (Self, FakeChatRemote) {
        let (tx_to_local, rx_from_remote) = mpsc::unbounded_channel();
        let (tx_to_remote, rx_from_local) = mpsc::unbounded_channel();

        let remote = FakeChatRemote {
            tx: tx_to_local,
            rx: rx_from_local.into(),
        };

        let incoming = UnboundedReceiverStream::new(rx_from_remote);
        let outgoing = Box::pin(futures_util::sink::unfold(
            tx_to_remote,
            |tx: mpsc::UnboundedSender<Bytes>, frame: Bytes| async move {
                tx.send(frame)
                    .map_err(|_send_failed| std::io::Error::from(std::io::ErrorKind::BrokenPipe))?;
                Ok::<_, std::io::Error>(tx)
            },
        ));

        let chat = Self::start(
            tokio_runtime,
            incoming,
            outgoing,
            ws::Config::default(),
            listener,
            "fake chat".into(),
        );
        (chat, remote)
    }
}

impl FakeChatRemote {
    /// Send a [`RequestProto`] to the client.
    pub fn send_request(&self, request: RequestProto) -> Result<(), Disconnected> {
        log::debug!("sending binary RequestProto");
        let proto = MessageProto {
            r#type: Some(ChatMessageType::Request.into()),
            request: Some(request),
            response: None,
        };
        self.send_frame(proto)
    }

    /// Send a [`ResponseProto`] to the client.
    pub fn send_response(&self, response: ResponseProto) -> Result<(), Disconnected> {
        log::debug!("sending binary ResponseProto");
        let proto = MessageProto {
            r#type: Some(ChatMessageType::Response.into()),
            request: None,
            response: Some(response),
        };
        self.send_frame(proto)
    }

    /// Make the client's next read fail, as if the transport broke.
    pub fn send_io_error(&self, kind: std::io::ErrorKind) -> Result<(), Disconnected> {
        self.tx
            .send(Err(kind.into()))
            .map_err(|_failed_send| Disconnected)
    }

    /// Waits for the client's next request, or `None` once the client has hung up.
    pub async fn receive_request(&self) -> Result<Option<RequestProto>, ReceiveRequestError> {
        log::debug!("waiting for next request");
        match self.receive().await? {
            None => Ok(None),
            Some(ChatMessageProto::Request(request)) => Ok(Some(request)),
            Some(ChatMessageProto::Response(_)) => Err(ReceiveRequestError::GotResponse),
        }
    }

    /// Waits for the client's next response to a server request.
    pub async fn receive_response(&self) -> Result<Option<ResponseProto>, ReceiveRequestError> {
        log::debug!("waiting for next response");
        match self.receive().await? {
            None => Ok(None),
            Some(ChatMessageProto::Response(response)) => Ok(Some(response)),
            Some(ChatMessageProto::Request(_)) => Err(ReceiveRequestError::GotRequest),
        }
    }

    async fn receive(&self) -> Result<Option<ChatMessageProto>, ReceiveRequestError> {
        let Some(frame) = self.rx.lock().await.recv().await else {
            return Ok(None);
        };
        Ok(Some(ws::decode_and_validate(&frame)?))
    }

    fn send_frame(&self, proto: MessageProto) -> Result<(), Disconnected> {
        self.tx
            .send(Ok(proto.encode_to_vec().into()))
            .map_err(|_failed_send| Disconnected)
    }
}

impl From<ws::ChatProtoDataError> for ReceiveRequestError {
    fn from(value: ws::ChatProtoDataError) -> Self {
        Self::InvalidProto(value.to_string())
    }
}
