//! Error types for cache and configuration operations.

use std::path::PathBuf;

use kiln_codec::CodecError;

/// Errors that can occur during cache operations.
///
/// Read-side variants never escape [`RecordCache::get`](crate::RecordCache::get):
/// they are logged and turned into cache misses. Write-side and directory
/// variants are returned to the caller, who decides whether to continue
/// without the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Writing a cache file failed.
    #[error("cache write error at {path}: {source}")]
    Write {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading a cache file failed for a reason other than absence.
    #[error("cache read error at {path}: {source}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache root or one of its subdirectories could not be created or
    /// scanned.
    #[error("cache directory error at {path}: {source}")]
    Directory {
        /// The directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[source] CodecError),

    /// A record payload could not be decoded.
    #[error("failed to decode record in {path}: {source}")]
    Decode {
        /// The cache file.
        path: PathBuf,
        /// The codec failure.
        source: CodecError,
    },

    /// A cache file has an invalid or missing header.
    #[error("invalid cache file header in {path}: {reason}")]
    InvalidHeader {
        /// The cache file.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The cache file format version does not match the current version.
    #[error("format version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The cache file.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The version found in the file.
        actual: u32,
    },

    /// The record schema tag does not match the one the cache was opened with.
    #[error("schema mismatch in {path}: expected '{expected}', got '{actual}'")]
    SchemaMismatch {
        /// The cache file.
        path: PathBuf,
        /// The expected schema tag.
        expected: String,
        /// The schema tag found in the file.
        actual: String,
    },

    /// The file was written for a different artifact key.
    #[error("key mismatch in {path}: expected {expected}, got {actual}")]
    KeyMismatch {
        /// The cache file.
        path: PathBuf,
        /// Fingerprint of the requested key.
        expected: String,
        /// Fingerprint stored in the file.
        actual: String,
    },

    /// The stored checksum does not match the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The cache file.
        path: PathBuf,
        /// The checksum from the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// A cache file exceeds the configured size cap.
    #[error("cache file {path} is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        /// The cache file.
        path: PathBuf,
        /// Observed size in bytes.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// The header could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

/// Errors that can occur when loading a cache configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
