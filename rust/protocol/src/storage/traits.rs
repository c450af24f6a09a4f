//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Traits defining the stores consulted while sending.
//!
//! Every store is shared by all sends in flight for one account, so methods take `&self` and
//! implementations must be `Send + Sync`. Each individual call must be atomic with respect to the
//! address it touches; nothing here holds a lock across calls.

use async_trait::async_trait;
use chatbridge_core::{ProtocolAddress, ServiceId};

use crate::error::Result;
use crate::state::SessionRecord;
use crate::IdentityKey;

/// Interface defining the identity store, which may be in-memory, on-disk, etc.
///
/// Only the [Cipher](crate::Cipher) consults this store; the sender just passes it through.
#[async_trait]
pub trait IdentityKeyStore: Send + Sync {
    /// Return a [u32] specific to this store instance.
    ///
    /// This local registration id is separate from the per-device identifier used in
    /// [ProtocolAddress] and should not change run over run.
    async fn get_local_registration_id(&self) -> Result<u32>;

    /// Record an identity into the store. The identity is then considered "trusted".
    ///
    /// Returns `Ok(true)` if an existing, different identity was replaced.
    async fn save_identity(&self, address: &ProtocolAddress, identity: &IdentityKey)
        -> Result<bool>;

    /// Return the public identity for the given `address`, if known.
    async fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>>;
}

/// Interface for storing the session with each remote device.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the session corresponding to `address`.
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>>;

    /// Set the entry for `address` to the value of `record`.
    async fn store_session(&self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()>;

    /// Every session held for devices of `account`, ordered by device ID.
    ///
    /// Addresses and records come back paired, so a caller can never see one without the other.
    async fn sessions_for_account(
        &self,
        account: ServiceId,
    ) -> Result<Vec<(ProtocolAddress, SessionRecord)>>;

    /// Delete the session for `address`, if there is one.
    async fn remove_session(&self, address: &ProtocolAddress) -> Result<()>;
}

/// Lookup of the profile keys learned from other accounts.
#[async_trait]
pub trait ProfileKeyStore: Send + Sync {
    /// The raw profile key for `account`, if one has been shared with us.
    ///
    /// The bytes are returned unvalidated; a malformed key is reported when it is used.
    async fn profile_key(&self, account: ServiceId) -> Result<Option<Box<[u8]>>>;
}
