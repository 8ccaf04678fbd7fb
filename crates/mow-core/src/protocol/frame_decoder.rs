//! Fixed-width big-endian integer decoding for the counter feed.
//!
//! Wire format of one counter message:
//!
//! ```text
//! [b0][b1][b2][b3][b4][b5][b6][b7]     value = Σ b[i] * 256^(7-i)
//! ```
//!
//! # Weak contract
//!
//! The decoder accepts *any* length.  The producer always sends exactly
//! 8 bytes, but nothing here checks that:
//!
//! - fewer than 8 bytes decode as a smaller big-endian number
//!   (`[1, 0]` is `256`),
//! - an empty slice decodes as `0`,
//! - more than 8 bytes wrap, so the result is the value of the last 8 bytes.
//!
//! Malformed input therefore yields a well-defined but possibly meaningless
//! value instead of an error.  Callers wanting a strict check must add it on
//! top rather than change this function.

/// Number of bytes the producer uses for one counter value.
pub const COUNTER_WIDTH: usize = 8;

/// Interprets `bytes` as a big-endian unsigned integer.
///
/// Accumulates `value = value * 256 + byte` over the whole slice with
/// wrapping arithmetic.  Never fails.
///
/// # Examples
///
/// ```rust
/// use mow_core::protocol::decode_big_endian_u64;
///
/// assert_eq!(decode_big_endian_u64(&[0, 0, 0, 0, 0, 0, 0, 42]), 42);
/// assert_eq!(decode_big_endian_u64(&[0, 0, 0, 0, 0, 0, 1, 0]), 256);
/// ```
pub fn decode_big_endian_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |value, &byte| {
        value.wrapping_mul(256).wrapping_add(u64::from(byte))
    })
}

/// Encodes a counter value in the 8-byte big-endian layout the decoder reads.
pub fn encode_counter(value: u64) -> [u8; COUNTER_WIDTH] {
    value.to_be_bytes()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
