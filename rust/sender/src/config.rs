//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::time::Duration;

use chatbridge_protocol::padding::CURRENT_PADDING_VERSION;

/// How many times a send may be retried after the first attempt.
pub const DEFAULT_MAX_RETRY_DEPTH: u32 = 3;

/// Tunables for a [`Device`](crate::Device)'s outbound pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendConfig {
    /// Passed to [`pad`](chatbridge_protocol::padding::pad) for every message.
    pub padding_version: u32,
    /// Retries allowed after the first attempt; exceeding this fails the send.
    pub max_retry_depth: u32,
    /// Upper bound on the wait for each response; `None` waits as long as the connection lives.
    pub response_timeout: Option<Duration>,
    /// Whether the server may drop the message if the recipient is offline.
    pub online: bool,
    pub urgent: bool,
    /// Fetch pre-keys for all of our own devices before counting them for a self-sync.
    ///
    /// This is how linked devices added since the last send are discovered, including every
    /// linked device on a fresh install. Costs a request per synced message.
    pub refresh_own_sessions_before_sync: bool,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            padding_version: CURRENT_PADDING_VERSION,
            max_retry_depth: DEFAULT_MAX_RETRY_DEPTH,
            response_timeout: None,
            online: false,
            urgent: true,
            refresh_own_sessions_before_sync: true,
        }
    }
}
