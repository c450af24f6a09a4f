//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The `api` module and its submodules define the abstraction over anything that "behaves like
//! chat-server".

use std::convert::Infallible;

use chatbridge_net::infra::errors::{LogSafeDisplay, RetryLater};

pub mod certificate;
pub mod messages;

/// Marker wrapper for authenticated connections.
#[derive(derive_more::Deref)]
pub struct Auth<T>(pub T);

/// Marker wrapper for unauthenticated connections.
#[derive(derive_more::Deref)]
pub struct Unauth<T>(pub T);

/// Authorization for requests on unauthenticated connections involving other users.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UserBasedAuthorization {
    AccessKey([u8; 16]),
}

impl std::fmt::Debug for UserBasedAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessKey(_) => f.write_str("AccessKey(..)"),
        }
    }
}

#[derive(Debug, thiserror::Error, displaydoc::Display)]
#[cfg_attr(test, derive(Clone))]
#[ignore_extra_doc_attributes]
pub enum RequestError<E, D = DisconnectedError> {
    /// the request timed out
    Timeout,
    /// {0}
    Disconnected(D),
    /// {0}
    RetryLater(#[from] RetryLater),
    /// server-side error, retryable with backoff
    ServerSideError,
    /// {log_safe}
    ///
    /// This is distinct from `Disconnected` in that the request completed and we got a response,
    /// but nevertheless there was an unexpected failure. This likely indicates a bug (or at least
    /// a missing case) on either the client or server side.
    Unexpected { log_safe: String },
    /// {0}
    Other(E),
}
impl<E, D> LogSafeDisplay for RequestError<E, D>
where
    E: LogSafeDisplay,
    D: LogSafeDisplay,
{
}

impl<E, D> From<Infallible> for RequestError<E, D> {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

#[derive(Debug, thiserror::Error, displaydoc::Display)]
#[cfg_attr(test, derive(Clone))]
pub enum DisconnectedError {
    /// transport error: {log_safe}
    Transport { log_safe: String },
    /// the connection was closed
    Closed,
}

impl LogSafeDisplay for DisconnectedError {}

impl<E> From<DisconnectedError> for RequestError<E> {
    fn from(value: DisconnectedError) -> Self {
        Self::Disconnected(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
/// retry after completing a rate limit challenge {options:?}
pub struct RateLimitChallenge {
    pub token: String,
    pub options: Vec<ChallengeOption>,
}
impl LogSafeDisplay for RateLimitChallenge {}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[repr(u8)]
#[strum(serialize_all = "camelCase")]
pub enum ChallengeOption {
    PushChallenge,
    Captcha,
}

/// A convenience trait covering the Chat APIs used over an authenticated connection.
pub trait AuthenticatedChatApi:
    messages::AuthenticatedChatApi + certificate::AuthenticatedChatApi
{
}
impl<U> AuthenticatedChatApi for U where
    U: messages::AuthenticatedChatApi + certificate::AuthenticatedChatApi
{
}

/// A convenience trait covering the Chat APIs used over an unauthenticated connection.
pub trait UnauthenticatedChatApi: messages::UnauthenticatedChatApi {}
impl<U> UnauthenticatedChatApi for U where U: messages::UnauthenticatedChatApi {}
