//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Length-hiding padding applied to serialized content before encryption.
//!
//! From version 3 on, a message is extended to the next multiple of [PADDING_BLOCK_LEN] bytes:
//! the plaintext, one [PADDING_BOUNDARY_BYTE], then zeros.

/// Padded messages are always a multiple of this many bytes.
pub const PADDING_BLOCK_LEN: usize = 160;

/// Marks the end of a message and the start of any padding.
pub const PADDING_BOUNDARY_BYTE: u8 = 0x80;

/// The padding version current clients send.
pub const CURRENT_PADDING_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
pub enum PaddingError {
    /// unsupported padding version {0}
    UnsupportedVersion(u32),
    /// boundary byte position {position} is outside the {len}-byte buffer
    BoundaryOutOfBounds { position: usize, len: usize },
    /// padded message has no boundary byte
    MissingBoundary,
}

/// Pads `plaintext` according to `version`.
///
/// Version 2 leaves the message untouched; versions below that were never valid.
pub fn pad(version: u32, plaintext: &[u8]) -> Result<Vec<u8>, PaddingError> {
    match version {
        0 | 1 => Err(PaddingError::UnsupportedVersion(version)),
        2 => Ok(plaintext.to_vec()),
        _ => {
            let len_with_boundary = plaintext.len() + 1;
            let padded_len = len_with_boundary.div_ceil(PADDING_BLOCK_LEN) * PADDING_BLOCK_LEN;
            let mut buffer = vec![0; padded_len];
            buffer[..plaintext.len()].copy_from_slice(plaintext);
            write_boundary(&mut buffer, plaintext.len())?;
            Ok(buffer)
        }
    }
}

fn write_boundary(buffer: &mut [u8], position: usize) -> Result<(), PaddingError> {
    let len = buffer.len();
    let slot = buffer
        .get_mut(position)
        .ok_or(PaddingError::BoundaryOutOfBounds { position, len })?;
    *slot = PADDING_BOUNDARY_BYTE;
    Ok(())
}

/// Strips padding added by [pad] with version 3 or later.
pub fn unpad(padded: &[u8]) -> Result<&[u8], PaddingError> {
    let boundary = padded
        .iter()
        .rposition(|b| *b != 0)
        .ok_or(PaddingError::MissingBoundary)?;
    if padded[boundary] != PADDING_BOUNDARY_BYTE {
        return Err(PaddingError::MissingBoundary);
    }
    Ok(&padded[..boundary])
}
