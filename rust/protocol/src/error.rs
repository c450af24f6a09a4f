//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::error::Error;

use chatbridge_core::ProtocolAddress;

pub type Result<T> = std::result::Result<T, SignalProtocolError>;

/// Failures reported by the session, identity, and cipher capabilities.
#[derive(thiserror::Error, Debug)]
pub enum SignalProtocolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state for call to {0} to succeed: {1}")]
    InvalidState(&'static str, String),

    #[error("failed to decode protobuf: {0}")]
    ProtobufDecodingError(#[from] prost::DecodeError),

    #[error("untrusted identity for address {0}")]
    UntrustedIdentity(ProtocolAddress),

    #[error("session with '{0}' not found")]
    SessionNotFound(ProtocolAddress),
    #[error("invalid session structure")]
    InvalidSessionStructure,

    #[error("bad profile key length <{0}>")]
    InvalidProfileKeyLength(usize),

    #[error("invalid sealed sender message {0}")]
    InvalidSealedSenderMessage(String),
    #[error("self send of a sealed sender message")]
    SealedSenderSelfSend,

    #[error("application callback {0} failed with {1}")]
    ApplicationCallbackError(&'static str, Box<dyn Error + Send + Sync + 'static>),
}
