//! Hex-string codec for the BluCon wire format.
//!
//! Everything on the wire is treated as a lowercase hex string; commands
//! and responses are built and picked apart at hex-character granularity.

use crate::error::BluconError;

/// Render raw bytes as lowercase hex, two characters per byte.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string into bytes. Case insensitive; the input must be
/// contiguous pairs of hex digits and must yield at least one byte.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, BluconError> {
    let bytes = hex::decode(s).map_err(|e| BluconError::MalformedHex(format!("{e}: {s:?}")))?;
    if bytes.is_empty() {
        return Err(BluconError::MalformedHex(format!("no byte pairs in {s:?}")));
    }
    Ok(bytes)
}

/// Reject non-ASCII input before any character-offset slicing. Every
/// wire string is sliced at fixed hex-character offsets, which would
/// panic mid-codepoint on multi-byte input.
pub fn ensure_ascii(s: &str) -> Result<(), BluconError> {
    if s.is_ascii() {
        Ok(())
    } else {
        Err(BluconError::MalformedHex(format!("non-ascii input: {s:?}")))
    }
}

/// Split a hex string into 2-character chunks, left to right. On
/// odd-length input the final chunk is a single character; downstream
/// indexing counts on that chunk being present.
pub fn split_byte_pairs(s: &str) -> Vec<&str> {
    let mut pairs = Vec::with_capacity(s.len() / 2 + 1);
    let mut rest = s;
    while !rest.is_empty() {
        let (head, tail) = rest.split_at(rest.len().min(2));
        pairs.push(head);
        rest = tail;
    }
    pairs
}
