//! Shared foundational types for the Kiln build cache.
//!
//! This crate provides the content hash used for checksums and file names,
//! and the [`ArtifactKey`] that addresses one cached artifact version.

#![warn(missing_docs)]

pub mod hash;
pub mod key;

pub use hash::{ContentHash, ContentHasher, ParseHashError, HASH_LEN};
pub use key::ArtifactKey;
