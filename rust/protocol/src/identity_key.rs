//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use crate::{Result, SignalProtocolError};

/// The serialized public identity key of a remote device.
///
/// Only the [Cipher](crate::Cipher) interprets the key material; everything else treats it as an
/// opaque value to store and compare.
#[derive(Debug, PartialOrd, Ord, PartialEq, Eq, Clone, Hash)]
pub struct IdentityKey {
    serialized: Box<[u8]>,
}

impl IdentityKey {
    /// Serialized type byte plus 32-byte Curve25519 point.
    pub const SERIALIZED_LEN: usize = 33;

    #[inline]
    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }

    pub fn decode(value: &[u8]) -> Result<Self> {
        if value.len() != Self::SERIALIZED_LEN {
            return Err(SignalProtocolError::InvalidArgument(format!(
                "identity key must be {} bytes, got {}",
                Self::SERIALIZED_LEN,
                value.len()
            )));
        }
        Ok(Self {
            serialized: value.into(),
        })
    }
}

impl TryFrom<&[u8]> for IdentityKey {
    type Error = SignalProtocolError;

    fn try_from(value: &[u8]) -> Result<Self> {
        IdentityKey::decode(value)
    }
}
