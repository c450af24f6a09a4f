//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

#![warn(clippy::unwrap_used)]
#![deny(unsafe_code)]

mod cipher;
pub mod error;
mod identity_key;
pub mod padding;
mod profile_key;
pub mod proto;
mod protocol;
mod sealed_sender;
mod state;
mod storage;

use error::Result;

pub use {
    cipher::Cipher,
    error::SignalProtocolError,
    identity_key::IdentityKey,
    profile_key::{ProfileKey, ACCESS_KEY_LEN, PROFILE_KEY_LEN},
    protocol::{CiphertextMessage, CiphertextMessageType},
    sealed_sender::SenderCertificate,
    state::SessionRecord,
    storage::{
        IdentityKeyStore, InMemIdentityKeyStore, InMemProfileKeyStore, InMemSessionStore,
        ProfileKeyStore, SessionStore,
    },
};
