//! The [`Record`] trait and whole-record helpers.

use std::io::Write;

use crate::decoder::{DecodeLimits, Decoder};
use crate::encoder::Encoder;
use crate::error::CodecError;

/// A value that can be stored as one cache record.
///
/// Implementations write their fields in a fixed order and read them back in
/// the same order. There is no embedded schema: the field order is the
/// contract between writer and reader.
pub trait Record: Sized {
    /// Writes every field of `self`.
    fn encode<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), CodecError>;

    /// Reads the fields written by [`Record::encode`].
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError>;
}

/// Raw payloads are stored as a single byte string.
impl Record for Vec<u8> {
    fn encode<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), CodecError> {
        enc.write_bytes(self)
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.read_bytes().map(<[u8]>::to_vec)
    }
}

impl Record for String {
    fn encode<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), CodecError> {
        enc.write_str(self)
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.read_str().map(str::to_string)
    }
}

/// Encodes a record into a new buffer.
pub fn encode_to_vec<R: Record>(record: &R) -> Result<Vec<u8>, CodecError> {
    let mut enc = Encoder::buffer();
    record.encode(&mut enc)?;
    enc.finish()
}

/// Decodes a record that must span the whole of `bytes`.
pub fn decode_from_slice<R: Record>(bytes: &[u8], limits: DecodeLimits) -> Result<R, CodecError> {
    let mut dec = Decoder::with_limits(bytes, limits);
    let record = R::decode(&mut dec)?;
    dec.finish()?;
    Ok(record)
}
