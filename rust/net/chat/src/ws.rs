//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The `ws` module and its submodules implement a chat server based on REST-like requests over a
//! websocket, as implemented in [`chatbridge_net::chat`].

mod certificate;
mod messages;

use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use chatbridge_net::chat;
use chatbridge_net::infra::errors::{LogSafeDisplay, RetryLater};
use chatbridge_net::infra::{extract_retry_after_seconds, AsHttpHeader};

use crate::api::{DisconnectedError, RequestError, UserBasedAuthorization};
use crate::logging::DebugAsStrOrBytes;

const ACCESS_KEY_HEADER_NAME: http::HeaderName =
    http::HeaderName::from_static("unidentified-access-key");

/// Anything that can carry a [`chat::Request`] to the server and bring back its response.
#[async_trait]
pub trait WsConnection: Send + Sync {
    /// Sends `request`, using `log_safe_path` in place of its real path in logs.
    async fn send(
        &self,
        log_tag: &'static str,
        log_safe_path: &str,
        request: chat::Request,
    ) -> Result<chat::Response, chat::SendError>;
}

#[async_trait]
impl WsConnection for chat::ChatConnection {
    async fn send(
        &self,
        log_tag: &'static str,
        log_safe_path: &str,
        request: chat::Request,
    ) -> Result<chat::Response, chat::SendError> {
        let method = request.method.clone();
        log::info!("[{log_tag}] {method} {log_safe_path}");
        // Timeouts are applied by the caller, which decides how long a send may take.
        let result = chat::ChatConnection::send(self, request, None).await;
        match &result {
            Ok(response) => {
                log::info!("[{log_tag}] {method} {log_safe_path} -> {}", response.status)
            }
            Err(e) => log::warn!(
                "[{log_tag}] {method} {log_safe_path} failed: {}",
                e as &dyn LogSafeDisplay
            ),
        }
        result
    }
}

impl AsHttpHeader for UserBasedAuthorization {
    fn as_header(&self) -> (http::HeaderName, http::HeaderValue) {
        match self {
            UserBasedAuthorization::AccessKey(key) => (
                ACCESS_KEY_HEADER_NAME,
                BASE64_STANDARD
                    .encode(key)
                    .parse()
                    .expect("base64 is always a valid header value"),
            ),
        }
    }
}

impl<E> From<chat::SendError> for RequestError<E> {
    fn from(value: chat::SendError) -> Self {
        match value {
            chat::SendError::RequestTimedOut => RequestError::Timeout,
            chat::SendError::Disconnected => {
                RequestError::Disconnected(DisconnectedError::Closed)
            }
            e @ (chat::SendError::Io(_)
            | chat::SendError::IncomingDataInvalid
            | chat::SendError::RequestHasInvalidHeader) => {
                RequestError::Disconnected(DisconnectedError::Transport {
                    log_safe: (&e as &dyn LogSafeDisplay).to_string(),
                })
            }
        }
    }
}

/// Errors that arise from a response to a received request.
///
/// This doesn't include timeouts, since the request was known to be received
/// and the server sent a response.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
enum ResponseError {
    /// {0}
    RetryLater(RetryLater),
    /// the request did not pass server validation
    InvalidRequest,
    /// unexpected content-type {0:?}
    UnexpectedContentType(Option<http::HeaderValue>),
    /// unexpected response status {status}
    UnrecognizedStatus {
        status: http::StatusCode,
        response: chat::Response,
    },
    /// response had no body
    MissingBody,
    /// response body was not valid JSON
    InvalidJson,
    /// response body didn't match the schema
    UnexpectedData,
}
impl LogSafeDisplay for ResponseError {}

/// How an endpoint wants an unsuccessful response to be reported.
enum CustomError<E> {
    /// Fall back to the generic classification.
    NoCustomHandling,
    Err(E),
    Unexpected { log_safe: String },
}

impl<E> From<E> for CustomError<E> {
    fn from(value: E) -> Self {
        Self::Err(value)
    }
}

impl ResponseError {
    fn into_request_error<E>(
        self,
        map_unrecognized: impl FnOnce(&chat::Response) -> CustomError<E>,
    ) -> RequestError<E> {
        match self {
            ResponseError::RetryLater(retry_later) => RequestError::RetryLater(retry_later),
            e @ (ResponseError::InvalidRequest
            | ResponseError::UnexpectedContentType(_)
            | ResponseError::MissingBody
            | ResponseError::InvalidJson
            | ResponseError::UnexpectedData) => RequestError::Unexpected {
                log_safe: e.to_string(),
            },
            ResponseError::UnrecognizedStatus { status, response } => {
                match map_unrecognized(&response) {
                    CustomError::Err(e) => RequestError::Other(e),
                    CustomError::Unexpected { log_safe } => RequestError::Unexpected { log_safe },
                    CustomError::NoCustomHandling if status.is_server_error() => {
                        RequestError::ServerSideError
                    }
                    CustomError::NoCustomHandling => RequestError::Unexpected {
                        log_safe: format!("unexpected response status {status}"),
                    },
                }
            }
        }
    }
}

/// A trait for decoding typed responses from [`chat::Response`].
///
/// Defined this way (instead of with `Self` as the typed response) so that `try_into_response`
/// becomes available on `chat::Response` with a useful Jump to Definition (as opposed to the usual
/// From/Into idiom).
trait TryIntoResponse<R>: Sized {
    #[allow(clippy::result_large_err)] // ResponseError itself contains a chat::Response.
    fn try_into_response(self) -> Result<R, ResponseError>;
}

impl<R> TryIntoResponse<R> for chat::Response
where
    R: for<'a> serde::Deserialize<'a>,
{
    fn try_into_response(self) -> Result<R, ResponseError> {
        parse_json_from_body(&check_response_status(self)?)
    }
}

#[allow(clippy::result_large_err)]
fn parse_json_from_body<R>(response: &chat::Response) -> Result<R, ResponseError>
where
    R: for<'a> serde::Deserialize<'a>,
{
    let chat::Response {
        status: _,
        message: _,
        body,
        headers,
    } = response;

    let content_type = headers.get(http::header::CONTENT_TYPE);
    if content_type != Some(&http::HeaderValue::from_static("application/json")) {
        return Err(ResponseError::UnexpectedContentType(content_type.cloned()));
    }

    let body = body.as_ref().ok_or(ResponseError::MissingBody)?;
    serde_json::from_slice(body).map_err(|e| match e.classify() {
        serde_json::error::Category::Data => ResponseError::UnexpectedData,
        serde_json::error::Category::Syntax
        | serde_json::error::Category::Io
        | serde_json::error::Category::Eof => ResponseError::InvalidJson,
    })
}

#[allow(clippy::result_large_err)]
fn check_response_status(response: chat::Response) -> Result<chat::Response, ResponseError> {
    let chat::Response {
        status,
        message: _,
        body,
        headers,
    } = &response;
    if !status.is_success() {
        if status.as_u16() == 429 {
            if let Some(retry_after_seconds) = extract_retry_after_seconds(headers) {
                return Err(ResponseError::RetryLater(RetryLater {
                    retry_after_seconds,
                }));
            }
        }
        if status.as_u16() == 422 {
            return Err(ResponseError::InvalidRequest);
        }
        log::debug!(
            "got unsuccessful response with {status}: {:?}",
            DebugAsStrOrBytes(body.as_deref().unwrap_or_default())
        );
        return Err(ResponseError::UnrecognizedStatus {
            status: *status,
            response,
        });
    }
    Ok(response)
}
