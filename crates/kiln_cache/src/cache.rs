//! Keyed record cache for incremental builds.
//!
//! `RecordCache` ties the directory layout, the replace-on-write store, the
//! artifact framing and the codec together behind `get`/`put`/`invalidate`.
//! Reads are fail-safe: a missing, damaged, or foreign file is a cache miss,
//! never an error. Writes report failures so the caller can decide whether to
//! keep going without the cache.

use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use kiln_codec::{decode_from_slice, encode_to_vec, DecodeLimits, Record};
use kiln_common::ArtifactKey;

use crate::artifact::{self, ArtifactHeader};
use crate::config::CacheConfig;
use crate::directory::CacheDirectory;
use crate::error::CacheError;
use crate::store;

/// Persistent map from [`ArtifactKey`] to records of type `R`.
///
/// Operations on different keys are independent and may run on different
/// threads. Concurrent writers to the same key must be serialized by the
/// caller, and a cache root must not be shared between processes.
pub struct RecordCache<R> {
    dir: CacheDirectory,
    schema: String,
    max_file_bytes: u64,
    limits: DecodeLimits,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordCache<R> {
    /// Opens the cache described by `config`, creating its root if needed.
    pub fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        let dir = CacheDirectory::from_config(config);
        dir.ensure_root()?;
        Ok(Self {
            dir,
            schema: config.schema.clone(),
            max_file_bytes: config.max_file_bytes,
            limits: config.limits,
            _record: PhantomData,
        })
    }

    /// The directory manager backing this cache.
    pub fn directory(&self) -> &CacheDirectory {
        &self.dir
    }

    /// Path of the file that holds `key`'s record.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.path_for(key)
    }

    /// Looks up the record stored for `key`.
    ///
    /// Returns `None` when nothing is stored or when the stored file cannot be
    /// used; the reason is logged at debug level.
    pub fn get(&self, key: &ArtifactKey) -> Option<R> {
        let path = self.dir.path_for(key);
        match self.load(key, &path) {
            Ok(Some(record)) => {
                tracing::trace!(%key, "cache hit");
                Some(record)
            }
            Ok(None) => {
                tracing::trace!(%key, "cache miss");
                None
            }
            Err(err) => {
                tracing::debug!(%key, error = %err, "discarding unusable cache entry");
                None
            }
        }
    }

    fn load(&self, key: &ArtifactKey, path: &Path) -> Result<Option<R>, CacheError> {
        let limit = self.max_file_bytes;
        let Some(raw) = store::read_if_exists(path, |input| {
            let mut raw = Vec::new();
            input.take(limit.saturating_add(1)).read_to_end(&mut raw)?;
            Ok::<_, std::io::Error>(raw)
        })?
        else {
            return Ok(None);
        };
        let raw = raw.map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.len() as u64 > limit {
            return Err(CacheError::TooLarge {
                path: path.to_path_buf(),
                size: raw.len() as u64,
                limit,
            });
        }

        let (header, payload) = artifact::split_artifact(path, &raw)?;
        header.validate(path, &self.schema, key.fingerprint())?;
        let record = decode_from_slice(payload, self.limits).map_err(|source| {
            CacheError::Decode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Some(record))
    }

    /// Stores `record` under `key`, replacing any previous record.
    pub fn put(&self, key: &ArtifactKey, record: &R) -> Result<(), CacheError> {
        let payload = encode_to_vec(record).map_err(CacheError::Encode)?;
        let header = ArtifactHeader::new(&self.schema, key.fingerprint(), &payload);
        let header_bytes = header.to_prefixed_bytes()?;

        let path = self.dir.path_for(key);
        store::write_atomically(&path, |out| {
            out.write_all(&header_bytes)?;
            out.write_all(&payload)
        })?;
        tracing::trace!(%key, bytes = payload.len(), "cache write");
        Ok(())
    }

    /// Removes the record stored for `key`, if any. Returns whether a file
    /// was deleted; calling it again is harmless.
    pub fn invalidate(&self, key: &ArtifactKey) -> Result<bool, CacheError> {
        store::remove_if_exists(&self.dir.path_for(key))
    }

    /// Cheap validity check that reads only the file header.
    ///
    /// A `true` result means a file exists for `key` whose header carries the
    /// artifact magic, the current format version, this cache's schema and
    /// the key's fingerprint. The payload checksum and record are not
    /// verified, so a later [`get`](Self::get) can still miss.
    pub fn contains(&self, key: &ArtifactKey) -> bool {
        let path = self.dir.path_for(key);
        let outcome = store::read_if_exists(&path, |input| artifact::read_header(&path, input))
            .and_then(|header| match header {
                Some(header) => {
                    header?.validate(&path, &self.schema, key.fingerprint())?;
                    Ok(true)
                }
                None => Ok(false),
            });
        match outcome {
            Ok(found) => found,
            Err(err) => {
                tracing::debug!(%key, error = %err, "cache entry header rejected");
                false
            }
        }
    }
}
