//! Path derivation and enumeration for the cache root.
//!
//! Every entry lives at `<root>/<shard>/<fingerprint>.<ext>`, where
//! `fingerprint` is the 32-character hex digest of the artifact key and
//! `shard` is its first `shard_width` characters. Sharding keeps individual
//! directories small for large caches.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_common::{ArtifactKey, ContentHash};
use walkdir::WalkDir;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::store;

/// A cache file discovered by [`CacheDirectory::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Key fingerprint parsed from the file name.
    pub id: ContentHash,
    /// Full path of the file.
    pub path: PathBuf,
}

/// Entry count and disk usage of a cache root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache files.
    pub entries: usize,
    /// Sum of their sizes in bytes.
    pub total_bytes: u64,
}

/// Owns the mapping from artifact keys to file paths under one root.
#[derive(Debug, Clone)]
pub struct CacheDirectory {
    root: PathBuf,
    extension: String,
    shard_width: usize,
}

impl CacheDirectory {
    /// Creates a manager for `root` with default layout settings.
    ///
    /// Nothing is touched on disk until [`ensure_root`](Self::ensure_root)
    /// or the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(&CacheConfig::new(root))
    }

    /// Creates a manager using the layout settings of `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            root: config.root.clone(),
            extension: config.extension.clone(),
            shard_width: config.shard_width.min(32),
        }
    }

    /// The cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path for `key`. The same key always maps to the same
    /// path, in this process and in later runs.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.path_for_id(&key.fingerprint())
    }

    /// Returns the file path for a raw fingerprint.
    pub fn path_for_id(&self, id: &ContentHash) -> PathBuf {
        let name = id.to_string();
        let file = format!("{name}.{}", self.extension);
        if self.shard_width == 0 {
            self.root.join(file)
        } else {
            self.root.join(&name[..self.shard_width]).join(file)
        }
    }

    /// Creates the root directory tree if it is missing.
    pub fn ensure_root(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).map_err(|e| CacheError::Directory {
            path: self.root.clone(),
            source: e,
        })
    }

    /// Lazily enumerates the cache files currently on disk.
    ///
    /// Each call starts a fresh scan. Files that do not look like cache
    /// entries (wrong extension, name that is not a fingerprint, wrong shard)
    /// are skipped, as are entries that vanish or cannot be read mid-scan.
    pub fn list_entries(&self) -> Entries<'_> {
        let depth = if self.shard_width == 0 { 1 } else { 2 };
        let walk = WalkDir::new(&self.root)
            .min_depth(depth)
            .max_depth(depth)
            .follow_links(false)
            .into_iter();
        Entries { dir: self, walk }
    }

    /// Parses a path produced by [`path_for_id`](Self::path_for_id) back into
    /// its fingerprint.
    fn parse_entry(&self, path: &Path) -> Option<ContentHash> {
        if path.extension()? != self.extension.as_str() {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let id: ContentHash = stem.parse().ok()?;
        if self.path_for_id(&id) != path {
            return None;
        }
        Some(id)
    }

    /// Deletes every entry whose path matches `predicate`, returning how many
    /// files were removed. Shard directories left empty are removed too.
    pub fn prune<F>(&self, mut predicate: F) -> Result<usize, CacheError>
    where
        F: FnMut(&Path) -> bool,
    {
        let doomed: Vec<CacheEntry> = self
            .list_entries()
            .filter(|entry| predicate(entry.path.as_path()))
            .collect();

        let mut removed = 0;
        let mut touched_shards: Vec<PathBuf> = Vec::new();
        for entry in doomed {
            if store::remove_if_exists(&entry.path)? {
                removed += 1;
            }
            if self.shard_width > 0 {
                if let Some(parent) = entry.path.parent() {
                    if touched_shards.last().map(PathBuf::as_path) != Some(parent) {
                        touched_shards.push(parent.to_path_buf());
                    }
                }
            }
        }

        for shard in touched_shards {
            store::remove_empty_dir_best_effort(&shard);
        }

        tracing::debug!(root = %self.root.display(), removed, "pruned cache entries");
        Ok(removed)
    }

    /// Counts entries and their total size.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.list_entries() {
            stats.entries += 1;
            stats.total_bytes += fs::metadata(&entry.path).map(|m| m.len()).unwrap_or(0);
        }
        stats
    }
}

/// Iterator returned by [`CacheDirectory::list_entries`].
pub struct Entries<'a> {
    dir: &'a CacheDirectory,
    walk: walkdir::IntoIter,
}

impl Iterator for Entries<'_> {
    type Item = CacheEntry;

    fn next(&mut self) -> Option<CacheEntry> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    // A missing root is an empty cache, not an error.
                    let missing = err
                        .io_error()
                        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound);
                    if !missing {
                        tracing::debug!(
                            root = %self.dir.root.display(),
                            error = %err,
                            "failed to read cache directory entry"
                        );
                    }
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(id) = self.dir.parse_entry(entry.path()) {
                return Some(CacheEntry {
                    id,
                    path: entry.into_path(),
                });
            }
        }
    }
}
