//
// Copyright 2023-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! REST-like requests to the chat server, carried over a persistent connection.

use ::http::uri::PathAndQuery;
use ::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;

use crate::infra::errors::LogSafeDisplay;
use crate::proto;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod ws;

pub use ws::{ChatConnection, PendingResponse, Responder, ServerRequest};

pub type MessageProto = proto::chat_websocket::WebSocketMessage;
pub type RequestProto = proto::chat_websocket::WebSocketRequestMessage;
pub type ResponseProto = proto::chat_websocket::WebSocketResponseMessage;
pub type ChatMessageType = proto::chat_websocket::web_socket_message::Type;

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: ::http::Method,
    pub body: Option<Bytes>,
    pub headers: HeaderMap,
    pub path: PathAndQuery,
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub message: Option<String>,
    pub body: Option<Bytes>,
    pub headers: HeaderMap,
}

/// Why a request did not produce a response.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
#[cfg_attr(test, derive(PartialEq))]
pub enum SendError {
    /// the request timed out
    RequestTimedOut,
    /// the chat connection is closed
    Disconnected,
    /// transport I/O failure: {0}
    Io(std::io::ErrorKind),
    /// failed to decode data received from the server
    IncomingDataInvalid,
    /// request object must contain only ASCII text as header names and values
    RequestHasInvalidHeader,
}
impl LogSafeDisplay for SendError {}

impl Request {
    /// Encodes `self` for the wire, tagged with `id`.
    pub(crate) fn into_proto(self, id: u64) -> Result<RequestProto, SendError> {
        let Request {
            method,
            body,
            headers,
            path,
        } = self;
        let headers = headers
            .iter()
            .map(|(name, value)| {
                let value = value
                    .to_str()
                    .map_err(|_| SendError::RequestHasInvalidHeader)?;
                Ok(format!("{name}: {value}"))
            })
            .collect::<Result<_, SendError>>()?;
        Ok(RequestProto {
            verb: Some(method.to_string()),
            path: Some(path.to_string()),
            body: body.map(Vec::from),
            headers,
            id: Some(id),
        })
    }
}

impl TryFrom<ResponseProto> for Response {
    type Error = SendError;

    fn try_from(response_proto: ResponseProto) -> Result<Self, Self::Error> {
        let ResponseProto {
            id: _,
            status,
            message,
            headers,
            body,
        } = response_proto;
        let status = status
            .and_then(|status| u16::try_from(status).ok())
            .and_then(|status| StatusCode::from_u16(status).ok())
            .ok_or(SendError::IncomingDataInvalid)?;
        let headers = headers.into_iter().try_fold(
            HeaderMap::new(),
            |mut headers, header_string| {
                let (name, value) = header_string
                    .split_once(':')
                    .ok_or(SendError::IncomingDataInvalid)?;
                let header_name =
                    HeaderName::try_from(name).map_err(|_| SendError::IncomingDataInvalid)?;
                let header_value = HeaderValue::from_str(value.trim())
                    .map_err(|_| SendError::IncomingDataInvalid)?;
                headers.append(header_name, header_value);
                Ok::<HeaderMap, SendError>(headers)
            },
        )?;
        Ok(Response {
            status,
            message,
            body: body.map(Bytes::from),
            headers,
        })
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use http::Method;

    use super::*;

    #[test]
    fn proto_into_response_works_and_headers_parsed_correctly() {
        let proto = ResponseProto {
            status: Some(409),
            headers: vec![
                "content-type: application/json".to_owned(),
                format!("{}: {}", http::header::FORWARDED.as_str(), "1.1.1.1"),
                format!("{}: {}", http::header::FORWARDED.as_str(), "2.2.2.2"),
                "retry-after:  30 ".to_owned(),
            ],
            body: Some(b"{}".to_vec()),
            message: Some("Conflict".to_owned()),
            id: Some(4),
        };
        let response: Response = proto.try_into().expect("valid");
        assert_eq!(StatusCode::CONFLICT, response.status);
        assert_eq!(Some("Conflict"), response.message.as_deref());
        assert_eq!(Some(&b"{}"[..]), response.body.as_deref());
        assert_eq!(
            ["1.1.1.1", "2.2.2.2"],
            response
                .headers
                .get_all(http::header::FORWARDED)
                .iter()
                .map(|v| v.to_str().expect("ascii"))
                .collect::<Vec<_>>()[..]
        );
        assert_eq!(
            Some("30"),
            response
                .headers
                .get(http::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
        );
    }

    #[test]
    fn proto_into_response_fails_for_invalid_data() {
        fn validate_invalid_data(status: Option<u32>, headers: Vec<String>) {
            let proto = ResponseProto {
                status,
                headers,
                body: None,
                message: None,
                id: None,
            };
            let response: Result<Response, SendError> = proto.try_into();
            assert_matches!(response, Err(SendError::IncomingDataInvalid));
        }

        // status out of range of u16
        validate_invalid_data(Some(1 << 20), vec![]);
        // status in range, but value is invalid
        validate_invalid_data(Some(9999), vec![]);
        // status field is missing from the proto
        validate_invalid_data(None, vec![]);
        validate_invalid_data(Some(200), vec!["invalid header".to_owned()]);
        validate_invalid_data(Some(200), vec!["invalid name: value".to_owned()]);
    }

    #[test]
    fn request_into_proto() {
        let request = Request {
            method: Method::PUT,
            body: Some(Bytes::from_static(b"{}")),
            headers: HeaderMap::from_iter([(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )]),
            path: PathAndQuery::from_static("/v1/messages/abc"),
        };
        let proto = request.into_proto(17).expect("valid");
        assert_eq!(
            proto,
            RequestProto {
                verb: Some("PUT".to_owned()),
                path: Some("/v1/messages/abc".to_owned()),
                body: Some(b"{}".to_vec()),
                headers: vec!["content-type: application/json".to_owned()],
                id: Some(17),
            }
        );
    }

    #[test]
    fn request_rejects_non_ascii_headers() {
        let request = Request {
            method: Method::GET,
            body: None,
            headers: HeaderMap::from_iter([(
                HeaderName::from_static("x-test"),
                HeaderValue::from_bytes(b"caf\xc3\xa9").expect("opaque bytes are allowed"),
            )]),
            path: PathAndQuery::from_static("/"),
        };
        assert_matches!(
            request.into_proto(1),
            Err(SendError::RequestHasInvalidHeader)
        );
    }
}
