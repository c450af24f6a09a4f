//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

/// The kind of message the cipher produced, as reported alongside its serialized form.
#[derive(Copy, Clone, Eq, PartialEq, Debug, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
pub enum CiphertextMessageType {
    /// A message on an established session.
    Whisper = 2,
    /// The first message on a session, carrying the pre-key material the recipient needs.
    PreKey = 3,
    SenderKey = 7,
    Plaintext = 8,
}

/// An encrypted message addressed to a single device.
#[derive(Clone, Debug)]
pub struct CiphertextMessage {
    message_type: CiphertextMessageType,
    serialized: Box<[u8]>,
}

impl CiphertextMessage {
    pub fn new(message_type: CiphertextMessageType, serialized: impl Into<Box<[u8]>>) -> Self {
        Self {
            message_type,
            serialized: serialized.into(),
        }
    }

    pub fn message_type(&self) -> CiphertextMessageType {
        self.message_type
    }

    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }

    pub fn into_serialized(self) -> Box<[u8]> {
        self.serialized
    }
}
