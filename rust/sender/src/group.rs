//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chatbridge_core::{ServiceId, Timestamp};
use chatbridge_net_chat::logging::Redact;
use chatbridge_protocol::proto::service::Content;

use crate::{Device, FailedSendResult, SuccessfulSendResult};

/// Per-member results of one group send.
#[derive(Debug, Default)]
pub struct GroupSendResult {
    pub successfully_sent_to: Vec<SuccessfulSendResult>,
    pub failed_to_send_to: Vec<FailedSendResult>,
}

/// Coarse summary of a [`GroupSendResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum GroupSendOutcome {
    /// The group had no members other than us.
    NoRecipients,
    AllSucceeded,
    Partial,
    AllFailed,
}

impl GroupSendResult {
    pub fn outcome(&self) -> GroupSendOutcome {
        match (
            self.successfully_sent_to.is_empty(),
            self.failed_to_send_to.is_empty(),
        ) {
            (true, true) => GroupSendOutcome::NoRecipients,
            (false, true) => GroupSendOutcome::AllSucceeded,
            (false, false) => GroupSendOutcome::Partial,
            (true, false) => GroupSendOutcome::AllFailed,
        }
    }
}

impl Device {
    /// Sends `content` to each of `members` in turn, skipping our own account.
    ///
    /// A failure for one member never stops the others. Afterwards a single transcript listing
    /// every member that was reached is synced to our other devices.
    pub async fn send_group_message(
        &self,
        members: &[ServiceId],
        timestamp: Timestamp,
        content: Content,
    ) -> GroupSendResult {
        let mut result = GroupSendResult::default();
        for &member in members {
            if self.is_self(member) {
                continue;
            }
            match self.send_content(member, timestamp, &content).await {
                Ok(sent) => result.successfully_sent_to.push(sent),
                Err(error) => {
                    log::warn!(
                        "group send {} to {} failed: {error}",
                        timestamp.epoch_millis(),
                        Redact(&member)
                    );
                    result.failed_to_send_to.push(FailedSendResult {
                        recipient: member,
                        error,
                    });
                }
            }
        }
        log::info!(
            "group send {}: {} ({} sent, {} failed)",
            timestamp.epoch_millis(),
            result.outcome(),
            result.successfully_sent_to.len(),
            result.failed_to_send_to.len()
        );

        if let Some(data_message) = content.data_message {
            self.sync_to_own_devices(timestamp, data_message, None, &result.successfully_sent_to)
                .await;
        }
        result
    }
}
