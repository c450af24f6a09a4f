//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatbridge_core::{Aci, DeviceId, ProtocolAddress, ServiceId};
use chatbridge_net_chat::api::messages::{
    OutgoingMessages, SendMessageFailure, SendMessageResponse,
};
use chatbridge_net_chat::api::{RequestError, UserBasedAuthorization};
use chatbridge_protocol::{
    Cipher, CiphertextMessage, CiphertextMessageType, IdentityKeyStore, InMemIdentityKeyStore,
    InMemProfileKeyStore, InMemSessionStore, ProfileKeyStore, SenderCertificate, SessionRecord,
    SessionStore, SignalProtocolError,
};
use chatbridge_sender::{
    Connections, Device, DeviceSpecifier, PreKeyFetchError, PreKeyFetcher, SendConfig, Stores,
};

pub type SendResult = Result<SendMessageResponse, RequestError<SendMessageFailure>>;

pub const SELF_DEVICE: u8 = 1;
pub const CERTIFICATE: &[u8] = b"sender certificate";

pub fn aci(b: u8) -> Aci {
    Aci::from_uuid_bytes([b; 16])
}

pub fn device(id: u8) -> DeviceId {
    DeviceId::new(id).expect("valid")
}

pub fn me() -> Aci {
    aci(0x01)
}

/// Marks every produced message with the address it was encrypted for.
///
/// A session whose state is empty has not sent anything yet, so its first message is a pre-key
/// message and the state is then advanced.
#[derive(Default)]
pub struct FakeCipher;

impl FakeCipher {
    async fn advance(
        address: &ProtocolAddress,
        session_store: &dyn SessionStore,
    ) -> Result<CiphertextMessageType, SignalProtocolError> {
        let mut record = session_store
            .load_session(address)
            .await?
            .ok_or(SignalProtocolError::SessionNotFound(*address))?;
        let message_type = if record.state().is_empty() {
            CiphertextMessageType::PreKey
        } else {
            CiphertextMessageType::Whisper
        };
        record.set_state(b"ratcheted".as_slice());
        session_store.store_session(address, &record).await?;
        Ok(message_type)
    }
}

#[async_trait]
impl Cipher for FakeCipher {
    async fn encrypt(
        &self,
        padded_plaintext: &[u8],
        remote_address: &ProtocolAddress,
        session_store: &dyn SessionStore,
        _identity_store: &dyn IdentityKeyStore,
    ) -> Result<CiphertextMessage, SignalProtocolError> {
        let message_type = Self::advance(remote_address, session_store).await?;
        let mut serialized = vec![remote_address.device_id().get()];
        serialized.extend_from_slice(padded_plaintext);
        Ok(CiphertextMessage::new(message_type, serialized))
    }

    async fn sealed_sender_encrypt(
        &self,
        padded_plaintext: &[u8],
        remote_address: &ProtocolAddress,
        sender_certificate: &SenderCertificate,
        session_store: &dyn SessionStore,
        _identity_store: &dyn IdentityKeyStore,
    ) -> Result<Vec<u8>, SignalProtocolError> {
        assert_eq!(sender_certificate.serialized(), CERTIFICATE);
        Self::advance(remote_address, session_store).await?;
        let mut serialized = vec![remote_address.device_id().get()];
        serialized.extend_from_slice(padded_plaintext);
        Ok(serialized)
    }
}

/// Plays the part of the server's key directory: knows each account's devices and their
/// registration IDs, and installs fresh sessions on request.
pub struct FakePreKeyFetcher {
    sessions: Arc<InMemSessionStore>,
    directory: Mutex<HashMap<ServiceId, Vec<(u8, u32)>>>,
    calls: Mutex<Vec<(ServiceId, DeviceSpecifier)>>,
}

impl FakePreKeyFetcher {
    pub fn new(sessions: Arc<InMemSessionStore>) -> Self {
        Self {
            sessions,
            directory: Default::default(),
            calls: Default::default(),
        }
    }

    pub fn register(&self, account: impl Into<ServiceId>, devices: &[(u8, u32)]) {
        self.directory
            .lock()
            .expect("not poisoned")
            .insert(account.into(), devices.to_vec());
    }

    pub fn calls(&self) -> Vec<(ServiceId, DeviceSpecifier)> {
        self.calls.lock().expect("not poisoned").clone()
    }

    /// The fetches made for `account`, leaving out the refreshes of our own devices.
    pub fn calls_for(&self, account: impl Into<ServiceId>) -> Vec<DeviceSpecifier> {
        let account = account.into();
        self.calls()
            .into_iter()
            .filter_map(|(a, devices)| (a == account).then_some(devices))
            .collect()
    }
}

#[async_trait]
impl PreKeyFetcher for FakePreKeyFetcher {
    async fn fetch_and_establish(
        &self,
        account: ServiceId,
        devices: DeviceSpecifier,
    ) -> Result<(), PreKeyFetchError> {
        self.calls
            .lock()
            .expect("not poisoned")
            .push((account, devices));
        let known = self
            .directory
            .lock()
            .expect("not poisoned")
            .get(&account)
            .cloned()
            .ok_or(PreKeyFetchError::NotFound)?;
        let selected: Vec<_> = match devices {
            DeviceSpecifier::AllDevices => known,
            DeviceSpecifier::Specific(id) => known
                .into_iter()
                .filter(|(d, _)| *d == id.get())
                .collect(),
        };
        if selected.is_empty() {
            return Err(PreKeyFetchError::NotFound);
        }
        self.sessions
            .load_existing_sessions(selected.into_iter().map(|(d, reg)| {
                (
                    account.device(device(d)),
                    SessionRecord::new(reg, b"".as_slice()),
                )
            }))?;
        Ok(())
    }
}

/// One request seen by [`ScriptedChat`].
#[derive(Clone, Debug)]
pub struct SentRequest {
    pub destination: ServiceId,
    pub messages: OutgoingMessages,
    pub access_key: Option<[u8; 16]>,
}

/// Answers sends from a per-destination queue, accepting once a queue runs dry.
#[derive(Default)]
pub struct ScriptedChat {
    responses: Mutex<HashMap<ServiceId, VecDeque<SendResult>>>,
    sent: Mutex<Vec<SentRequest>>,
    pub certificate_fetches: Mutex<u32>,
}

impl ScriptedChat {
    pub fn script(
        &self,
        destination: impl Into<ServiceId>,
        responses: impl IntoIterator<Item = SendResult>,
    ) {
        self.responses
            .lock()
            .expect("not poisoned")
            .entry(destination.into())
            .or_default()
            .extend(responses);
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().expect("not poisoned").clone()
    }

    pub fn sent_to(&self, destination: impl Into<ServiceId>) -> Vec<SentRequest> {
        let destination = destination.into();
        self.sent()
            .into_iter()
            .filter(|r| r.destination == destination)
            .collect()
    }

    fn respond(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
        access_key: Option<[u8; 16]>,
    ) -> SendResult {
        self.sent.lock().expect("not poisoned").push(SentRequest {
            destination,
            messages: messages.clone(),
            access_key,
        });
        self.responses
            .lock()
            .expect("not poisoned")
            .get_mut(&destination)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(SendMessageResponse::default()))
    }
}

#[async_trait]
impl chatbridge_net_chat::api::messages::AuthenticatedChatApi for ScriptedChat {
    async fn send_message(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
    ) -> SendResult {
        self.respond(destination, messages, None)
    }
}

#[async_trait]
impl chatbridge_net_chat::api::messages::UnauthenticatedChatApi for ScriptedChat {
    async fn send_sealed_message(
        &self,
        destination: ServiceId,
        messages: &OutgoingMessages,
        auth: UserBasedAuthorization,
    ) -> SendResult {
        let UserBasedAuthorization::AccessKey(key) = auth;
        self.respond(destination, messages, Some(key))
    }
}

#[async_trait]
impl chatbridge_net_chat::api::certificate::AuthenticatedChatApi for ScriptedChat {
    async fn get_sender_certificate(&self) -> Result<Vec<u8>, RequestError<Infallible>> {
        *self.certificate_fetches.lock().expect("not poisoned") += 1;
        Ok(CERTIFICATE.to_vec())
    }
}

/// A [`Device`] for [`me`] wired to in-memory stores and scripted collaborators.
pub struct Harness {
    pub sessions: Arc<InMemSessionStore>,
    pub profile_keys: Arc<InMemProfileKeyStore>,
    pub pre_keys: Arc<FakePreKeyFetcher>,
    pub chat: Arc<ScriptedChat>,
    pub device: Device,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SendConfig::default())
    }

    pub fn with_config(config: SendConfig) -> Self {
        Self::build(config, None)
    }

    /// Uses `profile_key_store` in place of [`Harness::profile_keys`].
    pub fn with_profile_key_store(profile_key_store: Arc<dyn ProfileKeyStore>) -> Self {
        Self::build(SendConfig::default(), Some(profile_key_store))
    }

    fn build(config: SendConfig, profile_key_store: Option<Arc<dyn ProfileKeyStore>>) -> Self {
        let sessions = Arc::new(InMemSessionStore::new());
        let profile_keys = Arc::new(InMemProfileKeyStore::new());
        let pre_keys = Arc::new(FakePreKeyFetcher::new(sessions.clone()));
        let chat = Arc::new(ScriptedChat::default());
        let device = Device::new(
            me(),
            device(SELF_DEVICE),
            Stores {
                sessions: sessions.clone(),
                identities: Arc::new(InMemIdentityKeyStore::new(1)),
                profile_keys: profile_key_store
                    .unwrap_or_else(|| profile_keys.clone() as Arc<dyn ProfileKeyStore>),
            },
            Arc::new(FakeCipher),
            pre_keys.clone(),
            Connections {
                auth: chat.clone(),
                unauth: chat.clone(),
            },
            config,
        );
        Self {
            sessions,
            profile_keys,
            pre_keys,
            chat,
            device,
        }
    }

    /// Installs established sessions for `account` as if earlier messages had been exchanged.
    pub fn with_sessions(&self, account: impl Into<ServiceId>, devices: &[(u8, u32)]) {
        let account = account.into();
        self.sessions
            .load_existing_sessions(devices.iter().map(|&(d, reg)| {
                (
                    account.device(device(d)),
                    SessionRecord::new(reg, b"established".as_slice()),
                )
            }))
            .expect("not poisoned");
    }

    pub async fn session_devices(&self, account: impl Into<ServiceId>) -> Vec<u8> {
        self.sessions
            .sessions_for_account(account.into())
            .await
            .expect("not poisoned")
            .iter()
            .map(|(address, _)| address.device_id().get())
            .collect()
    }
}
