//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Outbound message dispatch for the chat bridge.
//!
//! A [`Device`] encrypts a message for every device of its recipient, picks sealed sender when it
//! can, sends the result over the chat connection, and repairs its sessions and retries when the
//! server reports that its view of the recipient's devices is out of date. Successful sends are
//! mirrored to the local account's other devices.

#![warn(clippy::unwrap_used)]

mod config;
pub mod content;
mod device;
mod dispatch;
mod envelope;
mod error;
mod group;
mod retry;
mod sealed;
mod send;
mod sync;

pub use config::{SendConfig, DEFAULT_MAX_RETRY_DEPTH};
pub use device::{Connections, Device, DeviceSpecifier, PreKeyFetcher, Stores};
pub use error::{PreKeyFetchError, SendError};
pub use group::{GroupSendOutcome, GroupSendResult};
pub use sealed::SendAuthorization;
pub use send::{FailedSendResult, SuccessfulSendResult};
