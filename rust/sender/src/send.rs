//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chatbridge_core::{ServiceId, Timestamp};
use chatbridge_net_chat::api::messages::SendMessageFailure;
use chatbridge_net_chat::api::RequestError;
use chatbridge_net_chat::logging::Redact;
use chatbridge_protocol::proto::service::Content;

use crate::dispatch::DispatchResult;
use crate::retry::{next_step, Repair, Step};
use crate::{content, Device, DeviceSpecifier, SendError};

/// A message the server accepted for one recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuccessfulSendResult {
    pub recipient: ServiceId,
    /// Whether the accepted attempt was sent with sealed sender.
    pub unidentified: bool,
}

/// A message that could not be delivered to one recipient.
#[derive(Debug, thiserror::Error)]
#[error("failed to send to {}: {error}", Redact(.recipient))]
pub struct FailedSendResult {
    pub recipient: ServiceId,
    #[source]
    pub error: SendError,
}

impl Device {
    /// Sends `content` to every device of `recipient`, then tells our other devices about it.
    ///
    /// The self-sync only happens when `content` has a data message, and never when
    /// `recipient` is our own account. Its failures are logged but do not affect the result.
    pub async fn send_message(
        &self,
        recipient: ServiceId,
        timestamp: Timestamp,
        content: Content,
    ) -> Result<SuccessfulSendResult, FailedSendResult> {
        let sent = self
            .send_content(recipient, timestamp, &content)
            .await
            .map_err(|error| FailedSendResult { recipient, error })?;

        if let Some(data_message) = content.data_message {
            if !self.is_self(recipient) {
                self.sync_to_own_devices(timestamp, data_message, Some(recipient), &[sent])
                    .await;
            }
        }
        Ok(sent)
    }

    /// Sends a plain text message stamped with the current time.
    pub async fn send_text(
        &self,
        recipient: ServiceId,
        text: impl Into<String>,
    ) -> Result<SuccessfulSendResult, FailedSendResult> {
        let timestamp = Timestamp::now();
        self.send_message(recipient, timestamp, content::text_content(text, timestamp))
            .await
    }

    /// Runs the encrypt, dispatch, repair cycle until the server accepts the message or the
    /// retry depth runs out.
    pub(crate) async fn send_content(
        &self,
        recipient: ServiceId,
        timestamp: Timestamp,
        content: &Content,
    ) -> Result<SuccessfulSendResult, SendError> {
        let mut depth = 0;
        loop {
            if depth > self.config.max_retry_depth {
                log::warn!(
                    "giving up on {} at {} after {depth} attempts",
                    Redact(&recipient),
                    timestamp.epoch_millis()
                );
                return Err(SendError::RetryExhausted { attempts: depth });
            }

            let authorization = self.select_authorization(recipient).await?;
            let envelopes = self
                .build_envelopes(recipient, content, &authorization)
                .await?;
            log::debug!(
                "sending {} envelope(s) to {} (sealed: {}, depth {depth})",
                envelopes.len(),
                Redact(&recipient),
                authorization.is_sealed(),
            );

            let response = self
                .dispatch(recipient, timestamp, envelopes, &authorization)
                .await;
            log_failure(recipient, &response);

            match next_step(response, depth) {
                Step::Sent { needs_sync } => {
                    log::info!(
                        "sent {} to {} (needs sync: {needs_sync})",
                        timestamp.epoch_millis(),
                        Redact(&recipient)
                    );
                    return Ok(SuccessfulSendResult {
                        recipient,
                        unidentified: authorization.is_sealed(),
                    });
                }
                Step::Retry {
                    repairs,
                    depth: next_depth,
                } => {
                    self.apply_repairs(recipient, &repairs).await?;
                    depth = next_depth;
                }
                Step::Failed(error) => return Err(error),
            }
        }
    }

    async fn apply_repairs(
        &self,
        recipient: ServiceId,
        repairs: &[Repair],
    ) -> Result<(), SendError> {
        for repair in repairs {
            match *repair {
                Repair::Establish(device_id) => {
                    log::info!(
                        "fetching pre-keys for {}",
                        Redact(&recipient.device(device_id))
                    );
                    self.pre_keys
                        .fetch_and_establish(recipient, DeviceSpecifier::Specific(device_id))
                        .await?;
                }
                Repair::Remove(device_id) => {
                    let address = recipient.device(device_id);
                    log::info!("removing session for {}", Redact(&address));
                    self.stores
                        .sessions
                        .remove_session(&address)
                        .await
                        .map_err(SendError::Storage)?;
                }
            }
        }
        Ok(())
    }
}

fn log_failure(recipient: ServiceId, response: &DispatchResult) {
    let Err(error) = response else {
        return;
    };
    match error {
        RequestError::Other(SendMessageFailure::ProofRequired {
            retry_after_seconds,
            challenge,
        }) => {
            log::warn!(
                "rate limited sending to {}: retry after {:?}s, challenge offered: {}",
                Redact(&recipient),
                retry_after_seconds,
                challenge.is_some()
            );
        }
        RequestError::Other(failure) => {
            log::info!("send to {} failed: {failure}", Redact(&recipient));
        }
        other => {
            log::warn!("send to {} failed: {other}", Redact(&recipient));
        }
    }
}
