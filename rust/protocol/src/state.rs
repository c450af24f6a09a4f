//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

/// Persisted ratchet state for one remote device.
///
/// The ratchet itself is owned by the [Cipher](crate::Cipher); this crate only needs the remote
/// registration ID, which goes on every envelope addressed to the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    remote_registration_id: u32,
    state: Box<[u8]>,
}

impl SessionRecord {
    pub fn new(remote_registration_id: u32, state: impl Into<Box<[u8]>>) -> Self {
        Self {
            remote_registration_id,
            state: state.into(),
        }
    }

    pub fn remote_registration_id(&self) -> u32 {
        self.remote_registration_id
    }

    /// The cipher-specific serialized state.
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// Replaces the serialized state after the cipher advances the ratchet.
    pub fn set_state(&mut self, state: impl Into<Box<[u8]>>) {
        self.state = state.into();
    }
}
