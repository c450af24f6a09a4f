//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

#![warn(clippy::unwrap_used)]

mod address;
mod timestamp;

pub use address::{
    Aci, DeviceId, InvalidDeviceId, Pni, ProtocolAddress, ServiceId, ServiceIdKind,
    SpecificServiceId, WrongKindOfServiceIdError,
};
pub use timestamp::Timestamp;
