//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatbridge_core::{Aci, DeviceId, ServiceId};
use chatbridge_net_chat::api::{AuthenticatedChatApi, UnauthenticatedChatApi};
use chatbridge_protocol::{
    Cipher, IdentityKeyStore, ProfileKeyStore, SenderCertificate, SessionStore,
};

use crate::{PreKeyFetchError, SendConfig};

/// Which of an account's devices a pre-key fetch covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceSpecifier {
    AllDevices,
    Specific(DeviceId),
}

/// Fetches pre-key bundles from the server and turns them into sessions.
///
/// On success, a session for every fetched device must be visible through the device's
/// [`SessionStore`] before the call returns.
#[async_trait]
pub trait PreKeyFetcher: Send + Sync {
    async fn fetch_and_establish(
        &self,
        account: ServiceId,
        devices: DeviceSpecifier,
    ) -> Result<(), PreKeyFetchError>;
}

/// The stores a [`Device`] reads and updates while sending.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub identities: Arc<dyn IdentityKeyStore>,
    pub profile_keys: Arc<dyn ProfileKeyStore>,
}

/// The two connections to the chat server a [`Device`] sends over.
#[derive(Clone)]
pub struct Connections {
    /// Logged in as this device; used for authenticated sends and certificate fetches.
    pub auth: Arc<dyn AuthenticatedChatApi>,
    /// Anonymous; used for sealed-sender sends.
    pub unauth: Arc<dyn UnauthenticatedChatApi>,
}

/// One registered client install of the local account, and everything needed to send as it.
///
/// All sending methods take `&self`, so one `Device` can serve any number of concurrent sends.
pub struct Device {
    pub(crate) aci: Aci,
    pub(crate) device_id: DeviceId,
    pub(crate) stores: Stores,
    pub(crate) cipher: Arc<dyn Cipher>,
    pub(crate) pre_keys: Arc<dyn PreKeyFetcher>,
    pub(crate) connections: Connections,
    pub(crate) config: SendConfig,
    pub(crate) sender_certificate: Mutex<Option<SenderCertificate>>,
}

impl Device {
    pub fn new(
        aci: Aci,
        device_id: DeviceId,
        stores: Stores,
        cipher: Arc<dyn Cipher>,
        pre_keys: Arc<dyn PreKeyFetcher>,
        connections: Connections,
        config: SendConfig,
    ) -> Self {
        Self {
            aci,
            device_id,
            stores,
            cipher,
            pre_keys,
            connections,
            config,
            sender_certificate: Mutex::new(None),
        }
    }

    pub fn aci(&self) -> Aci {
        self.aci
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn config(&self) -> &SendConfig {
        &self.config
    }

    pub(crate) fn is_self(&self, account: ServiceId) -> bool {
        account == ServiceId::from(self.aci)
    }
}
