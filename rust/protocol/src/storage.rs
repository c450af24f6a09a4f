//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Interfaces in [traits] and reference implementations in [inmem] for various mutable stores.

#![warn(missing_docs)]

mod inmem;
mod traits;

pub use inmem::{InMemIdentityKeyStore, InMemProfileKeyStore, InMemSessionStore};
pub use traits::{IdentityKeyStore, ProfileKeyStore, SessionStore};
