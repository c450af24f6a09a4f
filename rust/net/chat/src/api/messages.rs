//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use async_trait::async_trait;
use chatbridge_core::{DeviceId, ServiceId, Timestamp};
use chatbridge_net::infra::errors::LogSafeDisplay;
use itertools::Itertools as _;
use serde_with::base64::{Base64, Standard};
use serde_with::formats::Padded;
use serde_with::serde_as;

use super::{RateLimitChallenge, RequestError, UserBasedAuthorization};

/// How the server should treat an [`OutgoingMessage`]'s content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, num_enum::IntoPrimitive, serde::Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum EnvelopeType {
    Ciphertext = 1,
    PrekeyBundle = 3,
    UnidentifiedSender = 6,
}

/// The ciphertext for one of the recipient's devices.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    pub envelope_type: EnvelopeType,
    pub destination_device_id: DeviceId,
    pub destination_registration_id: u32,
    #[serde_as(as = "Base64<Standard, Padded>")]
    pub content: Vec<u8>,
}

/// Everything sent in a single request for one recipient.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OutgoingMessages {
    pub timestamp: Timestamp,
    pub online: bool,
    pub urgent: bool,
    pub messages: Vec<OutgoingMessage>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SendMessageResponse {
    /// Set when the server thinks the sender's other devices don't know about the message yet.
    pub needs_sync: bool,
}

/// A response the server sends instead of accepting the message.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum SendMessageFailure {
    /// The request didn't cover exactly the recipient's current devices.
    MismatchedDevices {
        missing_devices: Vec<DeviceId>,
        extra_devices: Vec<DeviceId>,
    },
    /// Some devices were re-registered since their sessions were established.
    StaleDevices { stale_devices: Vec<DeviceId> },
    /// The server wants proof that the sender is not a spammer.
    ProofRequired {
        retry_after_seconds: Option<u32>,
        challenge: Option<RateLimitChallenge>,
    },
    /// The server failed in a way that may be temporary.
    ServiceUnavailable(http::StatusCode),
    /// The server refused the message outright.
    Rejected(http::StatusCode),
}

impl std::fmt::Display for SendMessageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendMessageFailure::MismatchedDevices {
                missing_devices,
                extra_devices,
            } => write!(
                f,
                "mismatched devices (missing [{}], extra [{}])",
                missing_devices.iter().join(", "),
                extra_devices.iter().join(", ")
            ),
            SendMessageFailure::StaleDevices { stale_devices } => {
                write!(f, "stale devices [{}]", stale_devices.iter().join(", "))
            }
            SendMessageFailure::ProofRequired {
                retry_after_seconds,
                challenge: _,
            } => match retry_after_seconds {
                Some(seconds) => write!(f, "proof required, retry after {seconds}s"),
                None => f.write_str("proof required"),
            },
            SendMessageFailure::ServiceUnavailable(status) => {
                write!(f, "service unavailable ({status})")
            }
            SendMessageFailure::Rejected(status) => write!(f, "rejected with status {status}"),
        }
    }
}
impl LogSafeDisplay for SendMessageFailure {}

#[async_trait]
pub trait AuthenticatedChatApi: Send + Sync {
    /// Sends `messages` to `destination` as the logged-in account.
    async fn send_message(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
    ) -> Result<SendMessageResponse, RequestError<SendMessageFailure>>;
}

#[async_trait]
pub trait UnauthenticatedChatApi: Send + Sync {
    /// Sends sealed-sender `messages` to `destination`, authorized by `auth` rather than an
    /// account login.
    async fn send_sealed_message(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
        auth: UserBasedAuthorization,
    ) -> Result<SendMessageResponse, RequestError<SendMessageFailure>>;
}
