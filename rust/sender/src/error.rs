//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chatbridge_protocol::padding::PaddingError;
use chatbridge_protocol::{CiphertextMessageType, SignalProtocolError};

/// Why a message could not be delivered to one recipient.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum SendError {
    /// no sessions available for the recipient, even after fetching pre-keys
    SessionResolution,
    /// encryption failed: {0}
    Encryption(SignalProtocolError),
    /// the cipher produced an unsupported {0:?} message
    UnknownCiphertextKind(CiphertextMessageType),
    /// could not pad the message: {0}
    Padding(#[from] PaddingError),
    /// transport failure: {0}
    Transport(String),
    /// the server rejected the message with status {0}
    ProtocolStatus(u16),
    /// unexpected response: {0}
    UnexpectedResponse(String),
    /// gave up after {attempts} attempts
    RetryExhausted { attempts: u32 },
    /// session storage failed: {0}
    Storage(SignalProtocolError),
    /// failed to fetch pre-keys: {0}
    PreKeyFetch(#[from] PreKeyFetchError),
    /// could not get a sender certificate: {0}
    SenderCertificate(String),
}

/// Failure reported by a [`PreKeyFetcher`](crate::PreKeyFetcher).
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum PreKeyFetchError {
    /// the account or device is not registered
    NotFound,
    /// the request failed: {0}
    Request(String),
    /// could not establish a session: {0}
    Protocol(#[from] SignalProtocolError),
}
