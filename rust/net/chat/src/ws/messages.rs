//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use async_trait::async_trait;
use chatbridge_core::{DeviceId, ServiceId};
use chatbridge_net::chat::{Request, Response};
use chatbridge_net::infra::extract_retry_after_seconds;
use chatbridge_net::infra::AsHttpHeader as _;
use itertools::Itertools as _;

use super::{
    check_response_status, parse_json_from_body, CustomError, ResponseError, WsConnection,
};
use crate::api::messages::{OutgoingMessages, SendMessageFailure, SendMessageResponse};
use crate::api::{
    Auth, ChallengeOption, RateLimitChallenge, RequestError, Unauth, UserBasedAuthorization,
};
use crate::logging::Redact;

const JSON_CONTENT_TYPE: http::HeaderValue = http::HeaderValue::from_static("application/json");

#[async_trait]
impl<T: WsConnection> crate::api::messages::AuthenticatedChatApi for Auth<T> {
    async fn send_message(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
    ) -> Result<SendMessageResponse, RequestError<SendMessageFailure>> {
        send_messages(&self.0, "auth", destination, messages, None).await
    }
}

#[async_trait]
impl<T: WsConnection> crate::api::messages::UnauthenticatedChatApi for Unauth<T> {
    async fn send_sealed_message(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
        auth: UserBasedAuthorization,
    ) -> Result<SendMessageResponse, RequestError<SendMessageFailure>> {
        send_messages(&self.0, "unauth", destination, messages, Some(auth)).await
    }
}

async fn send_messages(
    connection: &impl WsConnection,
    log_tag: &'static str,
    destination: ServiceId,
    messages: &OutgoingMessages,
    auth: Option<UserBasedAuthorization>,
) -> Result<SendMessageResponse, RequestError<SendMessageFailure>> {
    let log_safe_path = format!("/v1/messages/{}", Redact(&destination));
    let request_path = format!("/v1/messages/{}", destination.service_id_string());
    let body = serde_json::to_vec(messages).map_err(|e| RequestError::Unexpected {
        log_safe: format!("could not serialize messages: {e}"),
    })?;

    let response = connection
        .send(
            log_tag,
            &log_safe_path,
            Request {
                method: http::Method::PUT,
                path: request_path
                    .parse()
                    .expect("service ID strings are valid in paths"),
                headers: http::HeaderMap::from_iter(
                    [(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)]
                        .into_iter()
                        .chain(auth.map(|auth| auth.as_header())),
                ),
                body: Some(body.into()),
            },
        )
        .await?;

    match check_response_status(response) {
        Ok(response) => Ok(parse_send_response(&response)),
        // The message itself was malformed; there is nothing to retry.
        Err(ResponseError::InvalidRequest) => Err(RequestError::Other(
            SendMessageFailure::Rejected(http::StatusCode::UNPROCESSABLE_ENTITY),
        )),
        Err(e) => Err(e.into_request_error(classify_send_failure)),
    }
}

/// The server has accepted the message by now, so a body that can't be read only costs the
/// `needsSync` hint.
fn parse_send_response(response: &Response) -> SendMessageResponse {
    #[derive(Default, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawSendMessageResponse {
        #[serde(default)]
        needs_sync: bool,
    }

    // Older servers answer with no body at all.
    let Some(body) = response.body.as_deref().filter(|body| !body.is_empty()) else {
        return SendMessageResponse::default();
    };
    match serde_json::from_slice::<RawSendMessageResponse>(body) {
        Ok(RawSendMessageResponse { needs_sync }) => SendMessageResponse { needs_sync },
        Err(e) => {
            log::warn!(
                "ignoring unreadable body of accepted send ({:?}): {:?} error",
                response.headers.get(http::header::CONTENT_TYPE),
                e.classify()
            );
            SendMessageResponse::default()
        }
    }
}

fn classify_send_failure(response: &Response) -> CustomError<SendMessageFailure> {
    match response.status.as_u16() {
        409 => parse_mismatched_devices(response),
        410 => parse_stale_devices(response),
        428 => SendMessageFailure::ProofRequired {
            retry_after_seconds: extract_retry_after_seconds(&response.headers),
            challenge: parse_challenge(response),
        }
        .into(),
        500 | 503 => SendMessageFailure::ServiceUnavailable(response.status).into(),
        _ => SendMessageFailure::Rejected(response.status).into(),
    }
}

fn validate_device_ids(
    input: Vec<u8>,
    label: &'static str,
) -> Result<Vec<DeviceId>, CustomError<SendMessageFailure>> {
    input
        .into_iter()
        .map(|id| {
            DeviceId::new(id).map_err(|_| CustomError::Unexpected {
                log_safe: format!("invalid device ID {id} in {label} array"),
            })
        })
        .try_collect()
}

fn parse_mismatched_devices(response: &Response) -> CustomError<SendMessageFailure> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ParsedMismatchedDevices {
        #[serde(default)]
        missing_devices: Vec<u8>,
        #[serde(default)]
        extra_devices: Vec<u8>,
    }

    let ParsedMismatchedDevices {
        missing_devices,
        extra_devices,
    } = match parse_json_from_body(response) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CustomError::Unexpected {
                log_safe: format!("invalid 409 body: {e}"),
            }
        }
    };
    let parsed = validate_device_ids(missing_devices, "missingDevices").and_then(|missing| {
        Ok((missing, validate_device_ids(extra_devices, "extraDevices")?))
    });
    match parsed {
        Ok((missing_devices, extra_devices)) => SendMessageFailure::MismatchedDevices {
            missing_devices,
            extra_devices,
        }
        .into(),
        Err(e) => e,
    }
}

fn parse_stale_devices(response: &Response) -> CustomError<SendMessageFailure> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ParsedStaleDevices {
        #[serde(default)]
        stale_devices: Vec<u8>,
    }

    let ParsedStaleDevices { stale_devices } = match parse_json_from_body(response) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CustomError::Unexpected {
                log_safe: format!("invalid 410 body: {e}"),
            }
        }
    };
    match validate_device_ids(stale_devices, "staleDevices") {
        Ok(stale_devices) => SendMessageFailure::StaleDevices { stale_devices }.into(),
        Err(e) => e,
    }
}

/// The challenge is informational only, so a missing or malformed one is not an error.
fn parse_challenge(response: &Response) -> Option<RateLimitChallenge> {
    #[derive(serde::Deserialize)]
    struct ParsedChallenge {
        token: String,
        #[serde(default)]
        options: Vec<String>,
    }

    response.body.as_ref()?;
    let ParsedChallenge { token, options } = parse_json_from_body(response)
        .inspect_err(|e| log::warn!("ignoring unparseable challenge: {e}"))
        .ok()?;
    let options = options
        .iter()
        .filter_map(|option| {
            option
                .parse::<ChallengeOption>()
                .inspect_err(|_| log::info!("ignoring unknown challenge option {option:?}"))
                .ok()
        })
        .collect();
    Some(RateLimitChallenge { token, options })
}
