//! Artifact identity used to address cache entries.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hash::{ContentHash, ContentHasher};

/// Identifies one cacheable unit at one version.
///
/// A key pairs a logical name (typically a source path) with the content hash
/// of the inputs that produced the artifact. Editing the source changes the
/// content hash and therefore the key, so stale entries are never returned for
/// new inputs.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    name: String,
    content: ContentHash,
}

impl ArtifactKey {
    /// Creates a key from a logical name and a content hash.
    pub fn new(name: impl Into<String>, content: ContentHash) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Creates a key for in-memory content under the given name.
    pub fn for_content(name: impl Into<String>, content: &[u8]) -> Self {
        Self::new(name, ContentHash::from_bytes(content))
    }

    /// Reads a file and keys it by its path and current contents.
    pub fn for_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read(path)?;
        Ok(Self::for_content(
            path.to_string_lossy().into_owned(),
            &content,
        ))
    }

    /// The logical name of the artifact.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The content hash of the artifact's inputs.
    pub fn content(&self) -> ContentHash {
        self.content
    }

    /// Stable digest of the whole key, used to derive file names.
    pub fn fingerprint(&self) -> ContentHash {
        ContentHasher::new()
            .update_prefixed(self.name.as_bytes())
            .update(self.content.as_bytes())
            .finish()
    }
}

impl fmt::Debug for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactKey({}@{})", self.name, self.content)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_share_fingerprint() {
        let a = ArtifactKey::for_content("src/lib.kt", b"fun main() {}");
        let b = ArtifactKey::for_content("src/lib.kt", b"fun main() {}");
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn content_change_changes_key() {
        let a = ArtifactKey::for_content("src/lib.kt", b"v1");
        let b = ArtifactKey::for_content("src/lib.kt", b"v2");
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn name_change_changes_key() {
        let hash = ContentHash::from_bytes(b"same");
        let a = ArtifactKey::new("a.kt", hash);
        let b = ArtifactKey::new("b.kt", hash);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_is_stable() {
        // Fingerprints name files on disk, so they must not change between runs.
        let key = ArtifactKey::new("x", ContentHash::from_raw([7; 16]));
        let again = ArtifactKey::new("x", ContentHash::from_raw([7; 16]));
        assert_eq!(key.fingerprint().to_string(), again.fingerprint().to_string());
    }

    #[test]
    fn for_file_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.kt");
        std::fs::write(&path, "val x = 1").unwrap();

        let key = ArtifactKey::for_file(&path).unwrap();
        assert_eq!(key.content(), ContentHash::from_bytes(b"val x = 1"));
        assert!(key.name().ends_with("unit.kt"));
    }

    #[test]
    fn for_file_missing_errors() {
        assert!(ArtifactKey::for_file(Path::new("/nonexistent/unit.kt")).is_err());
    }

    #[test]
    fn display_includes_name_and_hash() {
        let key = ArtifactKey::for_content("main.kt", b"body");
        let s = key.to_string();
        assert!(s.starts_with("main.kt@"));
        assert_eq!(s.len(), "main.kt@".len() + 32);
    }
}
