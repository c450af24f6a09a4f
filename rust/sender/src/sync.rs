//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Telling the local account's other devices what this device sent.

use chatbridge_core::{ServiceId, Timestamp};
use chatbridge_protocol::proto::service::sync_message::{sent, Sent};
use chatbridge_protocol::proto::service::{Content, DataMessage, SyncMessage};

use crate::{Device, DeviceSpecifier, SuccessfulSendResult};

impl Device {
    /// Sends a `SyncMessage.Sent` transcript of `data_message` to our own account.
    ///
    /// `destination` is set for one-to-one sends and left empty for group sends. Does nothing
    /// if the account has no other devices, and only logs on failure.
    pub(crate) async fn sync_to_own_devices(
        &self,
        timestamp: Timestamp,
        data_message: DataMessage,
        destination: Option<ServiceId>,
        delivered: &[SuccessfulSendResult],
    ) {
        let own_account = ServiceId::from(self.aci);
        if self.config.refresh_own_sessions_before_sync {
            if let Err(e) = self
                .pre_keys
                .fetch_and_establish(own_account, DeviceSpecifier::AllDevices)
                .await
            {
                log::warn!("failed to refresh own sessions before sync: {e}");
            }
        }

        let other_devices = self.other_own_device_count().await;
        if other_devices == 0 {
            log::debug!("no other devices to sync {}", timestamp.epoch_millis());
            return;
        }

        let content = sync_content(timestamp, data_message, destination, delivered);
        match self.send_content(own_account, timestamp, &content).await {
            Ok(_) => log::info!(
                "synced {} to {other_devices} other device(s)",
                timestamp.epoch_millis()
            ),
            Err(e) => log::warn!("failed to sync {}: {e}", timestamp.epoch_millis()),
        }
    }

    async fn other_own_device_count(&self) -> usize {
        match self
            .stores
            .sessions
            .sessions_for_account(self.aci.into())
            .await
        {
            Ok(sessions) => sessions
                .iter()
                .filter(|(address, _)| address.device_id() != self.device_id)
                .count(),
            Err(e) => {
                log::warn!("failed to list own sessions: {e}");
                0
            }
        }
    }
}

fn sync_content(
    timestamp: Timestamp,
    data_message: DataMessage,
    destination: Option<ServiceId>,
    delivered: &[SuccessfulSendResult],
) -> Content {
    let unidentified_status = delivered
        .iter()
        .map(|result| sent::UnidentifiedDeliveryStatus {
            unidentified: Some(result.unidentified),
            destination_service_id: Some(result.recipient.service_id_string()),
        })
        .collect();
    Content {
        sync_message: Some(SyncMessage {
            sent: Some(Sent {
                timestamp: Some(timestamp.epoch_millis()),
                message: Some(data_message),
                unidentified_status,
                destination_service_id: destination.map(|d| d.service_id_string()),
            }),
        }),
        ..Default::default()
    }
}
