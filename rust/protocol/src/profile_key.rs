//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use aes::cipher::{BlockEncrypt as _, KeyInit as _};

use crate::SignalProtocolError;

pub const PROFILE_KEY_LEN: usize = 32;
pub const ACCESS_KEY_LEN: usize = 16;

/// The key an account shares with its contacts to let them read its profile.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProfileKey {
    bytes: [u8; PROFILE_KEY_LEN],
}

impl std::fmt::Debug for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileKey").finish_non_exhaustive()
    }
}

impl ProfileKey {
    pub fn create(bytes: [u8; PROFILE_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Derives the unidentified-access key presented when sending to this key's owner without
    /// revealing the sender.
    pub fn derive_access_key(&self) -> [u8; ACCESS_KEY_LEN] {
        // AES is used as a seeded PRNG: the access key is the encryption of the block [0, ..., 2].
        let aes = aes::Aes256Enc::new((&self.bytes).into());
        let mut buf = [0u8; ACCESS_KEY_LEN];
        buf[ACCESS_KEY_LEN - 1] = 2;
        aes.encrypt_block((&mut buf).into());
        buf
    }
}

impl TryFrom<&[u8]> for ProfileKey {
    type Error = SignalProtocolError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = value
            .try_into()
            .map_err(|_| SignalProtocolError::InvalidProfileKeyLength(value.len()))?;
        Ok(Self::create(bytes))
    }
}
