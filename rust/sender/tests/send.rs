//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

mod support;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chatbridge_core::{ServiceId, Timestamp};
use chatbridge_net_chat::api::messages::{EnvelopeType, SendMessageFailure, SendMessageResponse};
use chatbridge_net_chat::api::RequestError;
use chatbridge_protocol::padding::unpad;
use chatbridge_protocol::proto::service::Content;
use chatbridge_protocol::{ProfileKey, ProfileKeyStore, SignalProtocolError};
use chatbridge_sender::content::{text_content, typing_content};
use chatbridge_sender::{DeviceSpecifier, PreKeyFetchError, SendConfig, SendError};
use http::StatusCode;
use pretty_assertions::assert_eq;
use prost::Message as _;
use support::*;

const PROFILE_KEY: [u8; 32] = [0x42; 32];
const TIMESTAMP: Timestamp = Timestamp::from_epoch_millis(1_700_000_000_000);

fn bob() -> ServiceId {
    aci(0xb).into()
}

fn hello() -> Content {
    text_content("hello", TIMESTAMP)
}

fn failure(failure: SendMessageFailure) -> SendResult {
    Err(RequestError::Other(failure))
}

/// Recovers the content from a [`FakeCipher`] message.
fn decode(envelope_content: &[u8]) -> Content {
    let (_device, padded) = envelope_content.split_first().expect("non-empty");
    Content::decode(unpad(padded).expect("padded")).expect("valid protobuf")
}

#[test_log::test(tokio::test)]
async fn fetches_pre_keys_once_for_unknown_recipient() {
    let harness = Harness::new();
    harness.pre_keys.register(bob(), &[(1, 77)]);

    let sent = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");
    assert_eq!(sent.recipient, bob());
    assert!(!sent.unidentified);

    assert_eq!(
        harness.pre_keys.calls_for(bob()),
        [DeviceSpecifier::AllDevices]
    );
    let requests = harness.chat.sent_to(bob());
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.access_key, None);
    assert_eq!(request.messages.timestamp, TIMESTAMP);
    assert!(!request.messages.online);
    assert!(request.messages.urgent);
    let [envelope] = request.messages.messages.as_slice() else {
        panic!("expected exactly one envelope");
    };
    assert_eq!(envelope.envelope_type, EnvelopeType::PrekeyBundle);
    assert_eq!(envelope.destination_device_id, device(1));
    assert_eq!(envelope.destination_registration_id, 77);
    assert_eq!((envelope.content.len() - 1) % 160, 0);
    assert_eq!(decode(&envelope.content), hello());
}

#[test_log::test(tokio::test)]
async fn recipient_with_no_devices_fails_after_one_fetch() {
    let harness = Harness::new();

    let failed = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect_err("no devices");
    assert_eq!(failed.recipient, bob());
    assert_matches!(failed.error, SendError::SessionResolution);
    assert_eq!(harness.pre_keys.calls().len(), 1);
    assert!(harness.chat.sent().is_empty());
}

#[test_log::test(tokio::test)]
async fn one_envelope_per_session() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11), (2, 22), (3, 33)]);

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");

    assert!(harness.pre_keys.calls_for(bob()).is_empty());
    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 1);
    let summary: Vec<_> = requests[0]
        .messages
        .messages
        .iter()
        .map(|m| {
            (
                m.envelope_type,
                m.destination_device_id.get(),
                m.destination_registration_id,
            )
        })
        .collect();
    assert_eq!(
        summary,
        [
            (EnvelopeType::Ciphertext, 1, 11),
            (EnvelopeType::Ciphertext, 2, 22),
            (EnvelopeType::Ciphertext, 3, 33),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn gives_up_after_four_attempts() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.chat.script(
        bob(),
        std::iter::repeat_with(|| {
            failure(SendMessageFailure::ServiceUnavailable(
                StatusCode::SERVICE_UNAVAILABLE,
            ))
        })
        .take(10),
    );

    let failed = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect_err("exhausted");
    assert_matches!(failed.error, SendError::RetryExhausted { attempts: 4 });

    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| r.messages.timestamp == TIMESTAMP));
}

#[test_log::test(tokio::test)]
async fn succeeds_on_last_allowed_attempt() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.chat.script(
        bob(),
        [
            failure(SendMessageFailure::ServiceUnavailable(
                StatusCode::INTERNAL_SERVER_ERROR,
            )),
            failure(SendMessageFailure::ProofRequired {
                retry_after_seconds: Some(60),
                challenge: None,
            }),
            failure(SendMessageFailure::ServiceUnavailable(
                StatusCode::SERVICE_UNAVAILABLE,
            )),
            Ok(SendMessageResponse { needs_sync: true }),
        ],
    );

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");
    assert_eq!(harness.chat.sent().len(), 4);
}

#[test_log::test(tokio::test)]
async fn max_retry_depth_is_configurable() {
    let harness = Harness::with_config(SendConfig {
        max_retry_depth: 0,
        ..Default::default()
    });
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.chat.script(
        bob(),
        [failure(SendMessageFailure::ServiceUnavailable(
            StatusCode::SERVICE_UNAVAILABLE,
        ))],
    );

    let failed = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect_err("exhausted");
    assert_matches!(failed.error, SendError::RetryExhausted { attempts: 1 });
    assert_eq!(harness.chat.sent().len(), 1);
}

#[test_log::test(tokio::test)]
async fn mismatched_devices_are_repaired_before_retrying() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11), (5, 55)]);
    harness.pre_keys.register(bob(), &[(1, 11), (2, 22)]);
    harness.chat.script(
        bob(),
        [failure(SendMessageFailure::MismatchedDevices {
            missing_devices: vec![device(2)],
            extra_devices: vec![device(5)],
        })],
    );

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");

    assert_eq!(
        harness.pre_keys.calls_for(bob()),
        [DeviceSpecifier::Specific(device(2))]
    );
    assert_eq!(harness.session_devices(bob()).await, [1, 2]);

    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 2);
    let retried: Vec<_> = requests[1]
        .messages
        .messages
        .iter()
        .map(|m| (m.destination_device_id.get(), m.envelope_type))
        .collect();
    assert_eq!(
        retried,
        [(1, EnvelopeType::Ciphertext), (2, EnvelopeType::PrekeyBundle)]
    );
}

#[test_log::test(tokio::test)]
async fn stale_devices_get_fresh_sessions() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11), (3, 33)]);
    harness.pre_keys.register(bob(), &[(1, 11), (3, 99)]);
    harness.chat.script(
        bob(),
        [failure(SendMessageFailure::StaleDevices {
            stale_devices: vec![device(3)],
        })],
    );

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");

    assert_eq!(
        harness.pre_keys.calls_for(bob()),
        [DeviceSpecifier::Specific(device(3))]
    );
    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 2);
    let retried = &requests[1].messages.messages[1];
    assert_eq!(retried.destination_device_id, device(3));
    assert_eq!(retried.destination_registration_id, 99);
    assert_eq!(retried.envelope_type, EnvelopeType::PrekeyBundle);
}

#[test_log::test(tokio::test)]
async fn failed_repair_aborts_the_send() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.pre_keys.register(bob(), &[(1, 11)]);
    harness.chat.script(
        bob(),
        [failure(SendMessageFailure::MismatchedDevices {
            missing_devices: vec![device(4)],
            extra_devices: vec![],
        })],
    );

    let failed = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect_err("device 4 is unknown");
    assert_matches!(
        failed.error,
        SendError::PreKeyFetch(PreKeyFetchError::NotFound)
    );
    assert_eq!(harness.chat.sent().len(), 1);
}

#[test_log::test(tokio::test)]
async fn other_statuses_are_terminal() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.with_sessions(me(), &[(SELF_DEVICE, 1), (2, 2)]);
    harness.chat.script(
        bob(),
        [failure(SendMessageFailure::Rejected(StatusCode::BAD_REQUEST))],
    );

    let failed = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect_err("rejected");
    assert_matches!(failed.error, SendError::ProtocolStatus(400));
    assert_eq!(
        failed.to_string(),
        format!(
            "failed to send to {}: the server rejected the message with status 400",
            chatbridge_net_chat::logging::Redact(&bob())
        )
    );
    // No retry, and nothing to sync.
    assert_eq!(harness.chat.sent().len(), 1);
}

#[test_log::test(tokio::test)]
async fn sealed_sender_with_profile_key() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11), (2, 22)]);
    harness
        .profile_keys
        .set_profile_key(bob(), PROFILE_KEY.as_slice())
        .expect("not poisoned");

    for _ in 0..2 {
        let sent = harness
            .device
            .send_message(bob(), TIMESTAMP, hello())
            .await
            .expect("success");
        assert!(sent.unidentified);
    }

    let expected_key = ProfileKey::create(PROFILE_KEY).derive_access_key();
    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.access_key, Some(expected_key));
        assert!(request
            .messages
            .messages
            .iter()
            .all(|m| m.envelope_type == EnvelopeType::UnidentifiedSender));
    }
    assert_eq!(
        *harness.chat.certificate_fetches.lock().expect("not poisoned"),
        1
    );
}

#[test_log::test(tokio::test)]
async fn malformed_profile_key_sends_authenticated() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness
        .profile_keys
        .set_profile_key(bob(), [1u8; 5].as_slice())
        .expect("not poisoned");

    let sent = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");
    assert!(!sent.unidentified);
    assert_eq!(harness.chat.sent()[0].access_key, None);
    assert_eq!(
        *harness.chat.certificate_fetches.lock().expect("not poisoned"),
        0
    );
}

struct BrokenProfileKeys;

#[async_trait]
impl ProfileKeyStore for BrokenProfileKeys {
    async fn profile_key(
        &self,
        _account: ServiceId,
    ) -> Result<Option<Box<[u8]>>, SignalProtocolError> {
        Err(SignalProtocolError::InvalidState(
            "profile_key",
            "database is locked".to_owned(),
        ))
    }
}

#[test_log::test(tokio::test)]
async fn profile_key_lookup_failure_sends_authenticated() {
    let harness = Harness::with_profile_key_store(Arc::new(BrokenProfileKeys));
    harness.with_sessions(bob(), &[(1, 11)]);

    let sent = harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");
    assert!(!sent.unidentified);
    assert_eq!(harness.chat.sent()[0].access_key, None);
}

#[test_log::test(tokio::test)]
async fn syncs_transcript_to_other_own_devices() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.with_sessions(me(), &[(SELF_DEVICE, 1), (2, 2), (3, 3)]);

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");

    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].destination, bob());
    let sync = &requests[1];
    assert_eq!(sync.destination, ServiceId::from(me()));
    assert_eq!(sync.messages.timestamp, TIMESTAMP);
    let devices: Vec<_> = sync
        .messages
        .messages
        .iter()
        .map(|m| m.destination_device_id.get())
        .collect();
    assert_eq!(devices, [2, 3], "never sent to this device");

    let transcript = decode(&sync.messages.messages[0].content)
        .sync_message
        .and_then(|s| s.sent)
        .expect("has transcript");
    assert_eq!(transcript.timestamp, Some(TIMESTAMP.epoch_millis()));
    assert_eq!(transcript.message, hello().data_message);
    assert_eq!(
        transcript.destination_service_id,
        Some(bob().service_id_string())
    );
    assert_eq!(transcript.unidentified_status.len(), 1);
    assert_eq!(transcript.unidentified_status[0].unidentified, Some(false));
}

#[test_log::test(tokio::test)]
async fn sync_failures_do_not_fail_the_send() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.with_sessions(me(), &[(SELF_DEVICE, 1), (2, 2)]);
    harness.chat.script(
        me(),
        [failure(SendMessageFailure::Rejected(StatusCode::FORBIDDEN))],
    );

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("primary send succeeded");
    assert_eq!(harness.chat.sent_to(me()).len(), 1);
}

#[test_log::test(tokio::test)]
async fn no_sync_without_other_devices_or_data_message() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.with_sessions(me(), &[(SELF_DEVICE, 1)]);

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");
    assert!(harness.chat.sent_to(me()).is_empty());

    harness.with_sessions(me(), &[(2, 2)]);
    harness
        .device
        .send_message(bob(), TIMESTAMP, typing_content(true, TIMESTAMP, None))
        .await
        .expect("success");
    assert!(harness.chat.sent_to(me()).is_empty());
}

#[test_log::test(tokio::test)]
async fn own_devices_known_only_to_key_directory_get_transcript() {
    let harness = Harness::new();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness
        .pre_keys
        .register(me(), &[(SELF_DEVICE, 1), (2, 22)]);

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");

    assert_eq!(
        harness.pre_keys.calls(),
        [(ServiceId::from(me()), DeviceSpecifier::AllDevices)]
    );
    let sync = harness.chat.sent_to(me());
    assert_eq!(sync.len(), 1);
    let [envelope] = sync[0].messages.messages.as_slice() else {
        panic!("expected exactly one envelope");
    };
    assert_eq!(envelope.destination_device_id, device(2));
    assert_eq!(envelope.destination_registration_id, 22);
    assert_eq!(envelope.envelope_type, EnvelopeType::PrekeyBundle);
}

#[test_log::test(tokio::test)]
async fn own_session_refresh_can_be_turned_off() {
    let harness = Harness::with_config(SendConfig {
        refresh_own_sessions_before_sync: false,
        ..Default::default()
    });
    harness.with_sessions(bob(), &[(1, 11)]);
    harness
        .pre_keys
        .register(me(), &[(SELF_DEVICE, 1), (2, 22)]);

    harness
        .device
        .send_message(bob(), TIMESTAMP, hello())
        .await
        .expect("success");

    assert!(harness.pre_keys.calls().is_empty());
    assert!(harness.chat.sent_to(me()).is_empty());
}

#[test_log::test(tokio::test)]
async fn note_to_self_skips_this_device_and_sync() {
    let harness = Harness::new();
    harness.with_sessions(me(), &[(SELF_DEVICE, 1), (2, 2)]);

    harness
        .device
        .send_message(me().into(), TIMESTAMP, hello())
        .await
        .expect("success");

    let requests = harness.chat.sent();
    assert_eq!(requests.len(), 1);
    let devices: Vec<_> = requests[0]
        .messages
        .messages
        .iter()
        .map(|m| m.destination_device_id.get())
        .collect();
    assert_eq!(devices, [2]);
}

#[test_log::test(tokio::test)]
async fn concurrent_sends_share_one_device() {
    let harness = Harness::new();
    let carol: ServiceId = aci(0xc).into();
    harness.with_sessions(bob(), &[(1, 11)]);
    harness.with_sessions(carol, &[(1, 12)]);

    let (to_bob, to_carol) = tokio::join!(
        harness.device.send_message(bob(), TIMESTAMP, hello()),
        harness.device.send_text(carol, "hi carol"),
    );
    to_bob.expect("success");
    to_carol.expect("success");
    assert_eq!(harness.chat.sent_to(bob()).len(), 1);
    assert_eq!(harness.chat.sent_to(carol).len(), 1);
}
