//! Writing values to a byte sink.

use std::io::Write;

use kiln_common::ContentHash;

use crate::error::CodecError;
use crate::varint::{self, MAX_VARINT_LEN};

/// Largest count or byte length the format can express.
pub const MAX_ENCODED_LEN: usize = i32::MAX as usize;

/// Appends encoded values to any [`Write`] sink.
///
/// The layout is fixed and symmetric with [`Decoder`](crate::Decoder):
/// integers are LEB128 varints, byte strings and collections are prefixed by
/// their length, and nothing is self-tagged.
pub struct Encoder<W> {
    sink: W,
    written: usize,
}

impl Encoder<Vec<u8>> {
    /// Creates an encoder that writes into a fresh buffer.
    pub fn buffer() -> Self {
        Self::new(Vec::new())
    }
}

impl<W: Write> Encoder<W> {
    /// Wraps a sink.
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.written
    }

    /// Flushes and returns the underlying sink.
    pub fn finish(mut self) -> Result<W, CodecError> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.sink.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    fn put_varint(&mut self, value: u64) -> Result<(), CodecError> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let n = varint::encode(value, &mut buf);
        self.put(&buf[..n])
    }

    fn put_len(&mut self, len: usize) -> Result<(), CodecError> {
        if len > MAX_ENCODED_LEN {
            return Err(CodecError::InvalidLength {
                offset: self.written,
                declared: len as i64,
                limit: MAX_ENCODED_LEN as u64,
            });
        }
        self.write_i32(len as i32)
    }

    /// Writes an `i32`. Negative values are sign-extended and take ten bytes.
    pub fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.put_varint(i64::from(value) as u64)
    }

    /// Writes a `u32` varint.
    pub fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
        self.put_varint(u64::from(value))
    }

    /// Writes a `u64` varint.
    pub fn write_u64(&mut self, value: u64) -> Result<(), CodecError> {
        self.put_varint(value)
    }

    /// Writes an `i64` using zigzag encoding.
    pub fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
        self.put_varint(varint::zigzag(value))
    }

    /// Writes a boolean as a single `0` or `1` byte.
    pub fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.put(&[u8::from(value)])
    }

    /// Writes a length-prefixed byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.put_len(bytes.len())?;
        self.put(bytes)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    /// Writes the 16 raw bytes of a content hash.
    pub fn write_hash(&mut self, hash: &ContentHash) -> Result<(), CodecError> {
        self.put(hash.as_bytes())
    }

    /// Writes a presence flag followed by the value, if any.
    pub fn write_option<T>(
        &mut self,
        value: Option<T>,
        write_value: impl FnOnce(&mut Self, T) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        match value {
            Some(v) => {
                self.write_bool(true)?;
                write_value(self, v)
            }
            None => self.write_bool(false),
        }
    }

    /// Writes the element count, then every element in iteration order.
    ///
    /// An empty collection still writes a zero count.
    pub fn write_collection<I, F>(&mut self, items: I, mut write_item: F) -> Result<(), CodecError>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, I::Item) -> Result<(), CodecError>,
    {
        let iter = items.into_iter();
        let declared = iter.len();
        self.put_len(declared)?;

        let mut written = 0;
        for item in iter {
            write_item(self, item)?;
            written += 1;
        }
        if written != declared {
            return Err(CodecError::CountMismatch { declared, written });
        }
        Ok(())
    }
}
