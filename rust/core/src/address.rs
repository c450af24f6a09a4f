//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

#![warn(missing_docs)]

//! Types for identifying an account on the service and the individual devices registered to it.

use std::fmt;
use std::num::NonZeroU8;

use uuid::Uuid;

/// Known types of [ServiceId].
#[derive(Clone, Copy, Hash, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum ServiceIdKind {
    /// An [Aci].
    Aci,
    /// A [Pni].
    Pni,
}

impl fmt::Display for ServiceIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceIdKind::Aci => f.write_str("ACI"),
            ServiceIdKind::Pni => f.write_str("PNI"),
        }
    }
}

impl fmt::Debug for ServiceIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
/// expected a {expected} service ID but got a {actual} one
pub struct WrongKindOfServiceIdError {
    /// The kind being converted to.
    pub expected: ServiceIdKind,
    /// The kind actually present.
    pub actual: ServiceIdKind,
}

/// A service ID whose kind is known statically.
///
/// `RAW_KIND` is a raw [ServiceIdKind], since enums can't yet be used as const generic parameters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecificServiceId<const RAW_KIND: u8>(Uuid);

impl<const KIND: u8> SpecificServiceId<KIND> {
    /// Convenience constructor from raw UUID bytes.
    #[inline]
    pub const fn from_uuid_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl<const KIND: u8> std::hash::Hash for SpecificServiceId<KIND> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(self.0.as_bytes());
    }
}

impl<const KIND: u8> SpecificServiceId<KIND>
where
    ServiceId: From<Self>,
    Self: TryFrom<ServiceId>,
{
    /// The string form used in request paths and JSON bodies.
    pub fn service_id_string(&self) -> String {
        ServiceId::from(*self).service_id_string()
    }

    /// Parses the string form, returning `None` if it is invalid or of a different kind.
    pub fn parse_from_service_id_string(input: &str) -> Option<Self> {
        ServiceId::parse_from_service_id_string(input)?
            .try_into()
            .ok()
    }
}

impl<const KIND: u8> From<Uuid> for SpecificServiceId<KIND> {
    #[inline]
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl<const KIND: u8> From<SpecificServiceId<KIND>> for Uuid {
    #[inline]
    fn from(value: SpecificServiceId<KIND>) -> Self {
        value.0
    }
}

impl<const KIND: u8> fmt::Debug for SpecificServiceId<KIND>
where
    ServiceId: From<Self>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ServiceId::from(*self).fmt(f)
    }
}

/// The account identifier, stable for the lifetime of an account.
pub type Aci = SpecificServiceId<{ ServiceIdKind::Aci as u8 }>;

/// The phone-number identifier of an account.
pub type Pni = SpecificServiceId<{ ServiceIdKind::Pni as u8 }>;

/// An identifier for an account on the service.
///
/// Every account has exactly one [Aci]; messages may also be addressed to its [Pni]. Either way the
/// same set of devices is reached.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, derive_more::From)]
pub enum ServiceId {
    /// An ACI
    Aci(Aci),
    /// A PNI
    Pni(Pni),
}

impl ServiceId {
    /// The kind of service ID `self` is.
    #[inline]
    pub fn kind(&self) -> ServiceIdKind {
        match self {
            ServiceId::Aci(_) => ServiceIdKind::Aci,
            ServiceId::Pni(_) => ServiceIdKind::Pni,
        }
    }

    /// The string form used in request paths and JSON bodies.
    ///
    /// ACIs are bare hyphenated UUIDs; PNIs carry a `PNI:` prefix.
    pub fn service_id_string(&self) -> String {
        match self {
            ServiceId::Aci(aci) => aci.0.hyphenated().to_string(),
            ServiceId::Pni(pni) => format!("{}:{}", self.kind(), pni.0.hyphenated()),
        }
    }

    /// Parses the string form, returning `None` if invalid.
    ///
    /// UUID parsing is case-insensitive, but only the hyphenated layout is accepted.
    pub fn parse_from_service_id_string(input: &str) -> Option<Self> {
        fn parse_hyphenated(input: &str) -> Option<Uuid> {
            if input.len() != uuid::fmt::Hyphenated::LENGTH {
                return None;
            }
            Uuid::try_parse(input).ok()
        }

        match input.strip_prefix("PNI:") {
            Some(rest) => Some(Self::Pni(parse_hyphenated(rest)?.into())),
            None => Some(Self::Aci(parse_hyphenated(input)?.into())),
        }
    }

    /// Returns the UUID inside this service ID, discarding the kind.
    #[inline]
    pub fn raw_uuid(self) -> Uuid {
        match self {
            ServiceId::Aci(aci) => aci.into(),
            ServiceId::Pni(pni) => pni.into(),
        }
    }

    /// Addresses a particular device registered to this account.
    pub fn device(self, device_id: DeviceId) -> ProtocolAddress {
        ProtocolAddress::new(self, device_id)
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}>", self.kind(), self.raw_uuid())
    }
}

impl<const KIND: u8> TryFrom<ServiceId> for SpecificServiceId<KIND> {
    type Error = WrongKindOfServiceIdError;

    #[inline]
    fn try_from(value: ServiceId) -> Result<Self, Self::Error> {
        if u8::from(value.kind()) == KIND {
            return Ok(value.raw_uuid().into());
        }
        let expected = match value.kind() {
            ServiceIdKind::Aci => ServiceIdKind::Pni,
            ServiceIdKind::Pni => ServiceIdKind::Aci,
        };
        Err(WrongKindOfServiceIdError {
            expected,
            actual: value.kind(),
        })
    }
}

impl<const KIND: u8> PartialEq<ServiceId> for SpecificServiceId<KIND>
where
    ServiceId: From<SpecificServiceId<KIND>>,
{
    fn eq(&self, other: &ServiceId) -> bool {
        ServiceId::from(*self) == *other
    }
}

impl<const KIND: u8> PartialEq<SpecificServiceId<KIND>> for ServiceId
where
    ServiceId: From<SpecificServiceId<KIND>>,
{
    fn eq(&self, other: &SpecificServiceId<KIND>) -> bool {
        *self == ServiceId::from(*other)
    }
}

/// One registered client install of an account.
///
/// Valid device IDs are in the range `1..=127`; the primary device is always 1.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct DeviceId(NonZeroU8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
/// invalid device ID {0}
pub struct InvalidDeviceId(pub u32);

impl DeviceId {
    /// The largest device ID the service will assign.
    pub const MAX: u8 = 127;

    /// The primary device of every account.
    pub const PRIMARY: Self = match NonZeroU8::new(1) {
        Some(id) => Self(id),
        None => unreachable!(),
    };

    /// Validates and wraps `id`.
    pub fn new(id: u8) -> Result<Self, InvalidDeviceId> {
        match NonZeroU8::new(id) {
            Some(id) if id.get() <= Self::MAX => Ok(Self(id)),
            _ => Err(InvalidDeviceId(id.into())),
        }
    }

    /// The raw numeric value.
    #[inline]
    pub fn get(self) -> u8 {
        self.0.get()
    }
}

impl TryFrom<u32> for DeviceId {
    type Error = InvalidDeviceId;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InvalidDeviceId(value))
            .and_then(Self::new)
    }
}

impl From<DeviceId> for u32 {
    fn from(value: DeviceId) -> Self {
        value.get().into()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for DeviceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.get())
    }
}

/// A single recipient device: the `(account, device)` pair that owns one session.
///
/// Addresses are only ever discovered, from stored sessions or from a pre-key fetch.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ProtocolAddress {
    service_id: ServiceId,
    device_id: DeviceId,
}

impl ProtocolAddress {
    /// Create a new address.
    ///
    ///```
    /// use chatbridge_core::{Aci, DeviceId, ProtocolAddress};
    ///
    /// let account = Aci::from_uuid_bytes([0x11; 16]);
    /// let address = ProtocolAddress::new(account.into(), DeviceId::new(2).unwrap());
    ///
    /// assert_eq!(address.service_id(), account);
    /// assert_eq!(address.device_id().get(), 2);
    ///```
    pub fn new(service_id: ServiceId, device_id: DeviceId) -> Self {
        Self {
            service_id,
            device_id,
        }
    }

    /// The account this device belongs to.
    #[inline]
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// Which of the account's devices this is.
    #[inline]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }
}

impl fmt::Display for ProtocolAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.service_id.service_id_string(),
            self.device_id
        )
    }
}
