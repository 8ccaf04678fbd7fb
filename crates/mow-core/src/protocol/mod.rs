//! Wire-level helpers: the counter decoder and Annex-B framing utilities.

pub mod annexb;
pub mod frame_decoder;

pub use frame_decoder::{decode_big_endian_u64, encode_counter, COUNTER_WIDTH};
