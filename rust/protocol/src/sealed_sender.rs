//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use crate::{Result, SignalProtocolError};

/// The server-issued certificate that vouches for this device in sealed-sender messages.
///
/// The certificate is not validated here; the [Cipher](crate::Cipher) embeds it as-is and the
/// recipient does the checking.
#[derive(Clone, PartialEq, Eq)]
pub struct SenderCertificate {
    serialized: Box<[u8]>,
}

impl SenderCertificate {
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(SignalProtocolError::InvalidSealedSenderMessage(
                "empty sender certificate".to_owned(),
            ));
        }
        Ok(Self {
            serialized: data.into(),
        })
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl std::fmt::Debug for SenderCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderCertificate")
            .field("len", &self.serialized.len())
            .finish()
    }
}
