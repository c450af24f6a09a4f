//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use async_trait::async_trait;
use chatbridge_core::ProtocolAddress;

use crate::sealed_sender::SenderCertificate;
use crate::storage::{IdentityKeyStore, SessionStore};
use crate::{CiphertextMessage, Result};

/// The double-ratchet encryption primitive.
///
/// Implementations read the session for `remote_address` from `session_store`, advance it, and
/// write it back before returning. They must fail with
/// [SessionNotFound](crate::SignalProtocolError::SessionNotFound) rather than invent a session.
#[async_trait]
pub trait Cipher: Send + Sync {
    /// Encrypts `padded_plaintext` for an authenticated send.
    async fn encrypt(
        &self,
        padded_plaintext: &[u8],
        remote_address: &ProtocolAddress,
        session_store: &dyn SessionStore,
        identity_store: &dyn IdentityKeyStore,
    ) -> Result<CiphertextMessage>;

    /// Encrypts `padded_plaintext` and wraps it so that the server cannot see the sender.
    ///
    /// The result is the complete sealed-sender message, ready to be sent as an
    /// `UNIDENTIFIED_SENDER` envelope.
    async fn sealed_sender_encrypt(
        &self,
        padded_plaintext: &[u8],
        remote_address: &ProtocolAddress,
        sender_certificate: &SenderCertificate,
        session_store: &dyn SessionStore,
        identity_store: &dyn IdentityKeyStore,
    ) -> Result<Vec<u8>>;
}
