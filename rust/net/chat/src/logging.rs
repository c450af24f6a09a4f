//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chatbridge_core::{Aci, Pni, ProtocolAddress, ServiceId};

pub struct Redact<T>(pub T);
impl std::fmt::Display for Redact<&'_ uuid::Uuid> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "********-****-****-****-*********{:03x}",
            u16::from_be_bytes(
                *self
                    .0
                    .as_bytes()
                    .last_chunk()
                    .expect("more than two bytes long")
            ) & 0xFFF
        )
    }
}

impl std::fmt::Display for Redact<&'_ Aci> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Redact(&uuid::Uuid::from(*self.0)).fmt(f)
    }
}

impl std::fmt::Display for Redact<&'_ Pni> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PNI:{}", Redact(&uuid::Uuid::from(*self.0)))
    }
}

impl std::fmt::Display for Redact<&'_ ServiceId> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ServiceId::Aci(specific_service_id) => Redact(specific_service_id).fmt(f),
            ServiceId::Pni(specific_service_id) => Redact(specific_service_id).fmt(f),
        }
    }
}

impl std::fmt::Display for Redact<&'_ ProtocolAddress> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}",
            Redact(&self.0.service_id()),
            self.0.device_id()
        )
    }
}

pub struct DebugAsStrOrBytes<'b>(pub &'b [u8]);
impl std::fmt::Debug for DebugAsStrOrBytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(s) => s.fmt(f),
            Err(_) => hex::encode(self.0).fmt(f),
        }
    }
}
