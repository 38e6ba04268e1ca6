//! Compact binary encoding for cache records.
//!
//! Integers are LEB128 varints, byte strings and collections carry a length
//! prefix, and declared lengths are checked against [`DecodeLimits`] before
//! any allocation. Truncated or damaged input always produces a
//! [`CodecError`], never a panic or an unbounded read.

#![warn(missing_docs)]

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod record;
pub mod varint;

pub use decoder::{DecodeLimits, Decoder};
pub use encoder::{Encoder, MAX_ENCODED_LEN};
pub use error::CodecError;
pub use record::{decode_from_slice, encode_to_vec, Record};
