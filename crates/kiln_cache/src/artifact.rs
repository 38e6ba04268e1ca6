//! On-disk framing of a cache file.
//!
//! Layout: a 4-byte little-endian header length, the bincode-encoded
//! [`ArtifactHeader`], then the codec-encoded record payload. The header lets a
//! reader reject files from another format version, another record schema, or
//! another key, and detect torn or damaged payloads through the checksum.

use std::io::Read;
use std::path::Path;

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Kiln cache file.
pub const ARTIFACT_MAGIC: [u8; 4] = *b"KILN";

/// Current file format version. Increment on breaking changes to the header
/// or the framing.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Headers larger than this are rejected before decoding.
const MAX_HEADER_LEN: usize = 4096;

/// Header prepended to every cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// File format version.
    pub format_version: u32,

    /// Record schema tag supplied by the cache owner.
    pub schema: String,

    /// Fingerprint of the key the file was written for.
    pub key: ContentHash,

    /// Content hash of the payload.
    pub checksum: ContentHash,
}

impl ArtifactHeader {
    /// Builds the header for `payload` stored under `key`.
    pub fn new(schema: &str, key: ContentHash, payload: &[u8]) -> Self {
        Self {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            schema: schema.to_string(),
            key,
            checksum: ContentHash::from_bytes(payload),
        }
    }

    /// Checks everything except the payload checksum.
    pub fn validate(&self, path: &Path, schema: &str, key: ContentHash) -> Result<(), CacheError> {
        if self.magic != ARTIFACT_MAGIC {
            return Err(CacheError::InvalidHeader {
                path: path.to_path_buf(),
                reason: format!("bad magic bytes {:?}", self.magic),
            });
        }
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: ARTIFACT_FORMAT_VERSION,
                actual: self.format_version,
            });
        }
        if self.schema != schema {
            return Err(CacheError::SchemaMismatch {
                path: path.to_path_buf(),
                expected: schema.to_string(),
                actual: self.schema.clone(),
            });
        }
        if self.key != key {
            return Err(CacheError::KeyMismatch {
                path: path.to_path_buf(),
                expected: key.to_string(),
                actual: self.key.to_string(),
            });
        }
        Ok(())
    }

    /// Serializes the header together with its length prefix.
    pub fn to_prefixed_bytes(&self) -> Result<Vec<u8>, CacheError> {
        let header_bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        Ok(output)
    }
}

fn invalid_header(path: &Path, reason: impl Into<String>) -> CacheError {
    CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn decode_header(path: &Path, bytes: &[u8]) -> Result<ArtifactHeader, CacheError> {
    let (header, used) =
        bincode::serde::decode_from_slice::<ArtifactHeader, _>(bytes, bincode::config::standard())
            .map_err(|e| invalid_header(path, e.to_string()))?;
    if used != bytes.len() {
        return Err(invalid_header(path, "header length does not match its prefix"));
    }
    Ok(header)
}

fn check_header_len(path: &Path, header_len: usize) -> Result<(), CacheError> {
    if header_len > MAX_HEADER_LEN {
        return Err(invalid_header(
            path,
            format!("header length {header_len} exceeds {MAX_HEADER_LEN}"),
        ));
    }
    Ok(())
}

/// Splits a complete cache file into its header and verified payload.
///
/// The checksum is verified here; the caller still has to
/// [`validate`](ArtifactHeader::validate) the header against its own schema
/// and key.
pub fn split_artifact<'a>(
    path: &Path,
    raw: &'a [u8],
) -> Result<(ArtifactHeader, &'a [u8]), CacheError> {
    if raw.len() < 4 {
        return Err(invalid_header(path, "file too short for header length"));
    }
    let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    check_header_len(path, header_len)?;
    if raw.len() < 4 + header_len {
        return Err(invalid_header(path, "file ends inside header"));
    }

    let header = decode_header(path, &raw[4..4 + header_len])?;
    let payload = &raw[4 + header_len..];

    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok((header, payload))
}

/// Reads only the header from the front of a cache file.
pub fn read_header(path: &Path, input: &mut impl Read) -> Result<ArtifactHeader, CacheError> {
    let read_err = |source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut len_bytes = [0u8; 4];
    input.read_exact(&mut len_bytes).map_err(read_err)?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    check_header_len(path, header_len)?;

    let mut header_bytes = vec![0u8; header_len];
    input.read_exact(&mut header_bytes).map_err(read_err)?;
    decode_header(path, &header_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "test-schema";

    fn key() -> ContentHash {
        ContentHash::from_bytes(b"key")
    }

    fn framed(header: &ArtifactHeader, payload: &[u8]) -> Vec<u8> {
        let mut out = header.to_prefixed_bytes().unwrap();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn split_returns_payload() {
        let payload = b"encoded record";
        let raw = framed(&ArtifactHeader::new(SCHEMA, key(), payload), payload);
        let (header, body) = split_artifact(Path::new("a.bin"), &raw).unwrap();
        assert_eq!(body, payload);
        header.validate(Path::new("a.bin"), SCHEMA, key()).unwrap();
    }

    #[test]
    fn empty_payload_is_valid() {
        let raw = framed(&ArtifactHeader::new(SCHEMA, key(), b""), b"");
        let (_, body) = split_artifact(Path::new("a.bin"), &raw).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn truncated_payload_fails_checksum() {
        let payload = b"encoded record";
        let mut raw = framed(&ArtifactHeader::new(SCHEMA, key(), payload), payload);
        raw.truncate(raw.len() - 3);
        let err = split_artifact(Path::new("a.bin"), &raw).unwrap_err();
        assert!(matches!(err, CacheError::ChecksumMismatch { .. }));
    }

    #[test]
    fn truncated_header_rejected() {
        let payload = b"encoded record";
        let raw = framed(&ArtifactHeader::new(SCHEMA, key(), payload), payload);
        for cut in 0..8 {
            let err = split_artifact(Path::new("a.bin"), &raw[..cut]).unwrap_err();
            assert!(matches!(err, CacheError::InvalidHeader { .. }), "cut {cut}");
        }
    }

    #[test]
    fn garbage_rejected() {
        let err = split_artifact(Path::new("a.bin"), b"garbage data").unwrap_err();
        assert!(matches!(err, CacheError::InvalidHeader { .. }));
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut header = ArtifactHeader::new(SCHEMA, key(), b"data");
        header.magic = *b"BAAD";
        let err = header
            .validate(Path::new("a.bin"), SCHEMA, key())
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidHeader { .. }));
    }

    #[test]
    fn wrong_version_rejected() {
        let mut header = ArtifactHeader::new(SCHEMA, key(), b"data");
        header.format_version = 999;
        let err = header
            .validate(Path::new("a.bin"), SCHEMA, key())
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::VersionMismatch { actual: 999, .. }
        ));
    }

    #[test]
    fn wrong_schema_rejected() {
        let header = ArtifactHeader::new("old-schema", key(), b"data");
        let err = header
            .validate(Path::new("a.bin"), SCHEMA, key())
            .unwrap_err();
        assert!(matches!(err, CacheError::SchemaMismatch { .. }));
    }

    #[test]
    fn wrong_key_rejected() {
        let header = ArtifactHeader::new(SCHEMA, ContentHash::from_bytes(b"other"), b"data");
        let err = header
            .validate(Path::new("a.bin"), SCHEMA, key())
            .unwrap_err();
        assert!(matches!(err, CacheError::KeyMismatch { .. }));
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let raw = framed(&ArtifactHeader::new(SCHEMA, key(), b"data"), b"tampered");
        let err = split_artifact(Path::new("a.bin"), &raw).unwrap_err();
        assert!(matches!(err, CacheError::ChecksumMismatch { .. }));
    }

    #[test]
    fn oversized_header_length_rejected() {
        let mut raw = (MAX_HEADER_LEN as u32 + 1).to_le_bytes().to_vec();
        raw.extend_from_slice(&[0; 16]);
        let err = split_artifact(Path::new("a.bin"), &raw).unwrap_err();
        assert!(matches!(err, CacheError::InvalidHeader { .. }));
    }

    #[test]
    fn read_header_stops_before_payload() {
        let payload = vec![0xab; 1000];
        let header = ArtifactHeader::new(SCHEMA, key(), &payload);
        let raw = framed(&header, &payload);
        let mut cursor = std::io::Cursor::new(&raw);
        let read = read_header(Path::new("a.bin"), &mut cursor).unwrap();
        assert_eq!(read, header);
        assert_eq!(cursor.position() as usize, raw.len() - payload.len());
    }

    #[test]
    fn read_header_short_input_is_read_error() {
        let mut cursor = std::io::Cursor::new(vec![1u8, 0]);
        let err = read_header(Path::new("a.bin"), &mut cursor).unwrap_err();
        assert!(matches!(err, CacheError::Read { .. }));
    }
}
