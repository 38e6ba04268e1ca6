//! LEB128 varints and zigzag mapping.

/// Maximum encoded size of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes `value` as LEB128 into `buf`, returning the number of bytes used.
pub fn encode(mut value: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Outcome of decoding a varint from the front of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete value and the number of bytes it occupied.
    Value(u64, usize),
    /// The slice ended before the final byte.
    Truncated,
    /// More than ten bytes, or a tenth byte carrying bits above 64.
    Overlong,
}

/// Decodes a LEB128 varint from the front of `input`.
pub fn decode(input: &[u8]) -> Decoded {
    let mut value: u64 = 0;
    for (i, &byte) in input.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Decoded::Overlong;
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Decoded::Value(value, i + 1);
        }
    }
    Decoded::Truncated
}

/// Maps signed integers onto unsigned so small magnitudes stay short.
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag`].
pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
