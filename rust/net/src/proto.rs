//
// Copyright 2023-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

pub mod chat_websocket;
