//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chatbridge_core::{ProtocolAddress, ServiceId};
use chatbridge_net_chat::api::messages::{EnvelopeType, OutgoingMessage};
use chatbridge_net_chat::logging::Redact;
use chatbridge_protocol::proto::service::Content;
use chatbridge_protocol::{padding, CiphertextMessageType, SessionRecord};
use prost::Message as _;

use crate::sealed::SendAuthorization;
use crate::{Device, DeviceSpecifier, SendError};

impl Device {
    /// Encrypts `content` once for every device of `recipient` we hold a session with.
    ///
    /// When sending to our own account, this device is left out. If there are no sessions at
    /// all, pre-keys for all of the recipient's devices are fetched once before giving up.
    pub(crate) async fn build_envelopes(
        &self,
        recipient: ServiceId,
        content: &Content,
        authorization: &SendAuthorization,
    ) -> Result<Vec<OutgoingMessage>, SendError> {
        let mut sessions = self.sessions_for_recipient(recipient).await?;
        if sessions.is_empty() {
            log::info!(
                "no sessions for {}, fetching pre-keys",
                Redact(&recipient)
            );
            if let Err(e) = self
                .pre_keys
                .fetch_and_establish(recipient, DeviceSpecifier::AllDevices)
                .await
            {
                log::warn!("pre-key fetch for {} failed: {e}", Redact(&recipient));
            }
            sessions = self.sessions_for_recipient(recipient).await?;
        }
        if sessions.is_empty() {
            return Err(SendError::SessionResolution);
        }

        let padded = padding::pad(self.config.padding_version, &content.encode_to_vec())?;

        let mut envelopes = Vec::with_capacity(sessions.len());
        for (address, record) in sessions {
            envelopes.push(
                self.encrypt_for(&address, &record, &padded, authorization)
                    .await?,
            );
        }
        Ok(envelopes)
    }

    async fn sessions_for_recipient(
        &self,
        recipient: ServiceId,
    ) -> Result<Vec<(ProtocolAddress, SessionRecord)>, SendError> {
        let mut sessions = self
            .stores
            .sessions
            .sessions_for_account(recipient)
            .await
            .map_err(SendError::Storage)?;
        if self.is_self(recipient) {
            sessions.retain(|(address, _)| address.device_id() != self.device_id);
        }
        Ok(sessions)
    }

    async fn encrypt_for(
        &self,
        address: &ProtocolAddress,
        record: &SessionRecord,
        padded: &[u8],
        authorization: &SendAuthorization,
    ) -> Result<OutgoingMessage, SendError> {
        let (envelope_type, content) = match authorization {
            SendAuthorization::Sealed { certificate, .. } => {
                let sealed = self
                    .cipher
                    .sealed_sender_encrypt(
                        padded,
                        address,
                        certificate,
                        &*self.stores.sessions,
                        &*self.stores.identities,
                    )
                    .await
                    .map_err(SendError::Encryption)?;
                (EnvelopeType::UnidentifiedSender, sealed)
            }
            SendAuthorization::Authenticated => {
                let message = self
                    .cipher
                    .encrypt(
                        padded,
                        address,
                        &*self.stores.sessions,
                        &*self.stores.identities,
                    )
                    .await
                    .map_err(SendError::Encryption)?;
                let envelope_type = match message.message_type() {
                    CiphertextMessageType::PreKey => EnvelopeType::PrekeyBundle,
                    CiphertextMessageType::Whisper => EnvelopeType::Ciphertext,
                    other => return Err(SendError::UnknownCiphertextKind(other)),
                };
                (envelope_type, message.into_serialized().into_vec())
            }
        };

        Ok(OutgoingMessage {
            envelope_type,
            destination_device_id: address.device_id(),
            destination_registration_id: record.remote_registration_id(),
            content,
        })
    }
}
