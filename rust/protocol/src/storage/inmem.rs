//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chatbridge_core::{ProtocolAddress, ServiceId};

use crate::storage::traits;
use crate::{IdentityKey, Result, SessionRecord, SignalProtocolError};

fn poisoned(store: &'static str) -> SignalProtocolError {
    SignalProtocolError::InvalidState(store, "store lock poisoned".to_owned())
}

/// Reference implementation of [traits::IdentityKeyStore].
pub struct InMemIdentityKeyStore {
    id: u32,
    known_keys: Mutex<HashMap<ProtocolAddress, IdentityKey>>,
}

impl InMemIdentityKeyStore {
    /// Creates an empty store for the device with local registration ID `id`.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            known_keys: Default::default(),
        }
    }
}

#[async_trait]
impl traits::IdentityKeyStore for InMemIdentityKeyStore {
    async fn get_local_registration_id(&self) -> Result<u32> {
        Ok(self.id)
    }

    async fn save_identity(
        &self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
    ) -> Result<bool> {
        let mut known_keys = self
            .known_keys
            .lock()
            .map_err(|_| poisoned("save_identity"))?;
        match known_keys.insert(*address, identity.clone()) {
            None => Ok(false), // new key
            Some(k) => Ok(&k != identity),
        }
    }

    async fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>> {
        let known_keys = self
            .known_keys
            .lock()
            .map_err(|_| poisoned("get_identity"))?;
        Ok(known_keys.get(address).cloned())
    }
}

/// Reference implementation of [traits::SessionStore].
#[derive(Default)]
pub struct InMemSessionStore {
    // Ordered so that per-account enumeration comes back sorted by device.
    sessions: Mutex<BTreeMap<ProtocolAddress, SessionRecord>>,
}

impl InMemSessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Bulk-loads existing sessions, replacing any already present for the same addresses.
    pub fn load_existing_sessions(
        &self,
        sessions: impl IntoIterator<Item = (ProtocolAddress, SessionRecord)>,
    ) -> Result<()> {
        self.sessions
            .lock()
            .map_err(|_| poisoned("load_existing_sessions"))?
            .extend(sessions);
        Ok(())
    }
}

#[async_trait]
impl traits::SessionStore for InMemSessionStore {
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.lock().map_err(|_| poisoned("load_session"))?;
        Ok(sessions.get(address).cloned())
    }

    async fn store_session(&self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()> {
        self.sessions
            .lock()
            .map_err(|_| poisoned("store_session"))?
            .insert(*address, record.clone());
        Ok(())
    }

    async fn sessions_for_account(
        &self,
        account: ServiceId,
    ) -> Result<Vec<(ProtocolAddress, SessionRecord)>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| poisoned("sessions_for_account"))?;
        Ok(sessions
            .iter()
            .filter(|(address, _)| address.service_id() == account)
            .map(|(address, record)| (*address, record.clone()))
            .collect())
    }

    async fn remove_session(&self, address: &ProtocolAddress) -> Result<()> {
        // Removing an absent session silently does nothing.
        self.sessions
            .lock()
            .map_err(|_| poisoned("remove_session"))?
            .remove(address);
        Ok(())
    }
}

/// Reference implementation of [traits::ProfileKeyStore].
#[derive(Default)]
pub struct InMemProfileKeyStore {
    keys: Mutex<HashMap<ServiceId, Box<[u8]>>>,
}

impl InMemProfileKeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the profile key shared by `account`.
    pub fn set_profile_key(&self, account: ServiceId, key: impl Into<Box<[u8]>>) -> Result<()> {
        self.keys
            .lock()
            .map_err(|_| poisoned("set_profile_key"))?
            .insert(account, key.into());
        Ok(())
    }
}

#[async_trait]
impl traits::ProfileKeyStore for InMemProfileKeyStore {
    async fn profile_key(&self, account: ServiceId) -> Result<Option<Box<[u8]>>> {
        let keys = self.keys.lock().map_err(|_| poisoned("profile_key"))?;
        Ok(keys.get(&account).cloned())
    }
}
