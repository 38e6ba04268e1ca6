//! Error types for binary encoding and decoding.

/// Errors produced by the [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder).
///
/// Every decode-side variant describes damaged or untrusted input. Callers in
/// the cache treat them as a miss rather than a failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input ended in the middle of a value, or a value is malformed.
    #[error("corrupt data at offset {offset}: {reason}")]
    CorruptData {
        /// Byte offset where decoding failed.
        offset: usize,
        /// Description of the problem.
        reason: String,
    },

    /// A declared collection count or byte length is negative or exceeds the
    /// configured limit.
    #[error("invalid length {declared} at offset {offset} (limit {limit})")]
    InvalidLength {
        /// Byte offset of the length prefix.
        offset: usize,
        /// The length as declared in the stream.
        declared: i64,
        /// The maximum accepted length.
        limit: u64,
    },

    /// Bytes remain after every expected field was decoded.
    #[error("unexpected trailing data at offset {offset}: {remaining} bytes left")]
    UnexpectedTrailingData {
        /// Offset of the first unconsumed byte.
        offset: usize,
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// A collection iterator yielded a different number of items than it
    /// reported up front.
    #[error("collection declared {declared} elements but yielded {written}")]
    CountMismatch {
        /// Count written to the stream.
        declared: usize,
        /// Number of elements actually written.
        written: usize,
    },

    /// The output sink failed.
    #[error("encoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by damaged input rather than by the
    /// writer or its sink.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptData { .. } | Self::InvalidLength { .. } | Self::UnexpectedTrailingData { .. }
        )
    }
}
