//
// Copyright 2023-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

pub mod errors;

/// Types that can be attached to a request as a single HTTP header.
pub trait AsHttpHeader {
    fn as_header(&self) -> (http::HeaderName, http::HeaderValue);
}

/// Extracts and parses the `Retry-After` header.
///
/// Returns raw seconds rather than `Duration` to guarantee the smaller range.
///
/// Does not support the "http-date" form of the header.
pub fn extract_retry_after_seconds(headers: &http::header::HeaderMap) -> Option<u32> {
    headers
        .get(http::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
