//! Reading values back from an encoded byte slice.

use serde::Deserialize;

use kiln_common::{ContentHash, HASH_LEN};

use crate::error::CodecError;
use crate::varint::{self, Decoded};

/// Upper bounds applied to declared lengths before anything is allocated.
///
/// A corrupted length prefix must never turn into an enormous allocation or
/// an unbounded read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum element count of a single collection.
    pub max_collection_len: u32,
    /// Maximum length of a single byte string.
    pub max_bytes_len: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_collection_len: 1 << 24,
            max_bytes_len: 64 * 1024 * 1024,
        }
    }
}

/// Cursor over an encoded record.
///
/// Mirrors [`Encoder`](crate::Encoder) value for value. Every read either
/// consumes a complete value or fails without advancing past the end of the
/// input.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    limits: DecodeLimits,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder with default limits.
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_limits(input, DecodeLimits::default())
    }

    /// Creates a decoder with explicit limits.
    pub fn with_limits(input: &'a [u8], limits: DecodeLimits) -> Self {
        Self {
            input,
            pos: 0,
            limits,
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails with [`CodecError::UnexpectedTrailingData`] unless the input is
    /// fully consumed.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::UnexpectedTrailingData {
                offset: self.pos,
                remaining: self.remaining(),
            })
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::corrupt(
                self.pos,
                format!(
                    "unexpected end of input: need {n} bytes, {} left",
                    self.remaining()
                ),
            ));
        }
        let input = self.input;
        let slice = &input[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_varint(&mut self) -> Result<u64, CodecError> {
        match varint::decode(&self.input[self.pos..]) {
            Decoded::Value(value, len) => {
                self.pos += len;
                Ok(value)
            }
            Decoded::Truncated => Err(CodecError::corrupt(
                self.pos,
                "unexpected end of input inside varint",
            )),
            Decoded::Overlong => Err(CodecError::corrupt(self.pos, "varint is too long")),
        }
    }

    /// Reads a count or length prefix, rejecting negative values and values
    /// above `limit`.
    fn take_len(&mut self, limit: u32) -> Result<usize, CodecError> {
        let offset = self.pos;
        let declared = self.read_i32()?;
        if declared < 0 || declared as u32 > limit {
            return Err(CodecError::InvalidLength {
                offset,
                declared: i64::from(declared),
                limit: u64::from(limit),
            });
        }
        Ok(declared as usize)
    }

    /// Reads an `i32`, truncating the 64-bit varint as the writer extended it.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(self.take_varint()? as i32)
    }

    /// Reads a `u32` varint.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let offset = self.pos;
        let value = self.take_varint()?;
        u32::try_from(value).map_err(|_| CodecError::corrupt(offset, "u32 value out of range"))
    }

    /// Reads a `u64` varint.
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        self.take_varint()
    }

    /// Reads a zigzag-encoded `i64`.
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(varint::unzigzag(self.take_varint()?))
    }

    /// Reads a boolean; any byte other than `0` or `1` is corrupt.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        let offset = self.pos;
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::corrupt(
                offset,
                format!("invalid boolean byte {other:#04x}"),
            )),
        }
    }

    /// Reads a length-prefixed byte string, borrowing from the input.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.take_len(self.limits.max_bytes_len)?;
        self.take(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<&'a str, CodecError> {
        let offset = self.pos;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map_err(|e| CodecError::corrupt(offset, format!("invalid UTF-8: {e}")))
    }

    /// Reads the 16 raw bytes of a content hash.
    pub fn read_hash(&mut self) -> Result<ContentHash, CodecError> {
        let mut raw = [0u8; HASH_LEN];
        raw.copy_from_slice(self.take(HASH_LEN)?);
        Ok(ContentHash::from_raw(raw))
    }

    /// Reads a presence flag and, if set, the value.
    pub fn read_option<T>(
        &mut self,
        read_value: impl FnOnce(&mut Self) -> Result<T, CodecError>,
    ) -> Result<Option<T>, CodecError> {
        if self.read_bool()? {
            read_value(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads a count, then exactly that many elements, appending them to
    /// `target` in read order. Returns the number of elements read.
    pub fn read_collection<T, C, F>(
        &mut self,
        target: &mut C,
        mut read_item: F,
    ) -> Result<usize, CodecError>
    where
        C: Extend<T>,
        F: FnMut(&mut Self) -> Result<T, CodecError>,
    {
        let count = self.take_len(self.limits.max_collection_len)?;
        self.read_items(count, target, read_item)?;
        Ok(count)
    }

    fn read_items<T, C, F>(
        &mut self,
        count: usize,
        target: &mut C,
        mut read_item: F,
    ) -> Result<(), CodecError>
    where
        C: Extend<T>,
        F: FnMut(&mut Self) -> Result<T, CodecError>,
    {
        for _ in 0..count {
            let item = read_item(self)?;
            target.extend(std::iter::once(item));
        }
        Ok(())
    }

    /// Reads a collection into a new `Vec`.
    pub fn read_vec<T, F>(&mut self, read_item: F) -> Result<Vec<T>, CodecError>
    where
        F: FnMut(&mut Self) -> Result<T, CodecError>,
    {
        let count = self.take_len(self.limits.max_collection_len)?;
        // The declared count is untrusted: cap it by the bytes left.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        self.read_items(count, &mut items, read_item)?;
        Ok(items)
    }

    /// Skips a length-prefixed byte string without copying it.
    pub fn skip_bytes(&mut self) -> Result<(), CodecError> {
        self.read_bytes().map(|_| ())
    }

    /// Skips one varint of any width.
    pub fn skip_varint(&mut self) -> Result<(), CodecError> {
        self.take_varint().map(|_| ())
    }
}
