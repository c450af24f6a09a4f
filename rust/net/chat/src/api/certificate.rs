//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::convert::Infallible;

use async_trait::async_trait;

use super::RequestError;

#[async_trait]
pub trait AuthenticatedChatApi: Send + Sync {
    /// Fetches a serialized sender certificate for sealed-sender messages.
    ///
    /// The certificate is returned as-is; checking it is up to the caller.
    async fn get_sender_certificate(&self) -> Result<Vec<u8>, RequestError<Infallible>>;
}
