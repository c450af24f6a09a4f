//
// Copyright 2023-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Request/response plumbing for the chat service's websocket framing.

#![warn(clippy::unwrap_used)]

pub mod chat;
pub mod infra;
pub mod proto;
