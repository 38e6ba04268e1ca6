//! Incremental compilation cache management.
//!
//! This crate persists per-artifact compiled state under a cache root, one
//! file per [`ArtifactKey`](kiln_common::ArtifactKey). Files are replaced
//! wholesale on every write, framed with a validated header, and decoded with
//! the `kiln_codec` binary format. Any unusable file degrades to a cache miss.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod store;

pub use cache::RecordCache;
pub use config::{load_config, load_config_from_str, CacheConfig};
pub use directory::{CacheDirectory, CacheEntry, CacheStats, Entries};
pub use error::{CacheError, ConfigError};
pub use store::{read_if_exists, remove_if_exists, write_atomically};
