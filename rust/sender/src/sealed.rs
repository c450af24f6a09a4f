//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Choosing between sealed-sender and authenticated delivery.

use chatbridge_core::ServiceId;
use chatbridge_net_chat::api::certificate::AuthenticatedChatApi as _;
use chatbridge_net_chat::logging::Redact;
use chatbridge_protocol::{ProfileKey, SenderCertificate, ACCESS_KEY_LEN};

use crate::{Device, SendError};

/// How a message is attributed to its sender on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendAuthorization {
    /// Hidden from the server; the recipient learns the sender from `certificate`.
    Sealed {
        access_key: [u8; ACCESS_KEY_LEN],
        certificate: SenderCertificate,
    },
    /// Sent over the device's logged-in connection.
    Authenticated,
}

impl SendAuthorization {
    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed { .. })
    }
}

impl Device {
    /// Picks sealed sender whenever an access key for `recipient` can be derived.
    ///
    /// Only a failure to obtain the sender certificate is fatal; every problem with the
    /// recipient's profile key falls back to an authenticated send.
    pub(crate) async fn select_authorization(
        &self,
        recipient: ServiceId,
    ) -> Result<SendAuthorization, SendError> {
        let Some(access_key) = self.access_key_for(recipient).await else {
            return Ok(SendAuthorization::Authenticated);
        };
        let certificate = self.sender_certificate().await?;
        Ok(SendAuthorization::Sealed {
            access_key,
            certificate,
        })
    }

    async fn access_key_for(&self, recipient: ServiceId) -> Option<[u8; ACCESS_KEY_LEN]> {
        let raw = match self.stores.profile_keys.profile_key(recipient).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::info!(
                    "no profile key for {}, sending authenticated",
                    Redact(&recipient)
                );
                return None;
            }
            Err(e) => {
                log::warn!(
                    "profile key lookup for {} failed, sending authenticated: {e}",
                    Redact(&recipient)
                );
                return None;
            }
        };
        match ProfileKey::try_from(&raw[..]) {
            Ok(profile_key) => Some(profile_key.derive_access_key()),
            Err(e) => {
                log::warn!(
                    "unusable profile key for {}, sending authenticated: {e}",
                    Redact(&recipient)
                );
                None
            }
        }
    }

    /// The certificate attached to sealed-sender messages, fetched on first use.
    ///
    /// Once fetched the certificate is kept for the life of the `Device`, without checking its
    /// expiration. Two sends racing to fetch it both fetch, and the later result is kept.
    pub async fn sender_certificate(&self) -> Result<SenderCertificate, SendError> {
        if let Some(cached) = self
            .sender_certificate
            .lock()
            .expect("not poisoned")
            .clone()
        {
            return Ok(cached);
        }

        log::info!("fetching sender certificate");
        let serialized = self
            .connections
            .auth
            .get_sender_certificate()
            .await
            .map_err(|e| SendError::SenderCertificate(e.to_string()))?;
        let certificate = SenderCertificate::deserialize(&serialized)
            .map_err(|e| SendError::SenderCertificate(e.to_string()))?;

        *self.sender_certificate.lock().expect("not poisoned") = Some(certificate.clone());
        Ok(certificate)
    }
}
