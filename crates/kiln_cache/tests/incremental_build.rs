//! End-to-end incremental build scenarios against a real cache directory.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use kiln_cache::{write_atomically, CacheConfig, RecordCache};
use kiln_codec::{CodecError, Decoder, Encoder, Record};
use kiln_common::{ArtifactKey, ContentHash};

/// Stand-in for the compiled state of one source file.
#[derive(Debug, Clone, PartialEq)]
struct FileState {
    declarations: Vec<String>,
    dependencies: BTreeSet<ContentHash>,
    ir: Vec<u8>,
}

impl Record for FileState {
    fn encode<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), CodecError> {
        enc.write_collection(&self.declarations, |e, d| e.write_str(d))?;
        enc.write_collection(&self.dependencies, |e, h| e.write_hash(h))?;
        enc.write_bytes(&self.ir)
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let declarations = dec.read_vec(|d| d.read_str().map(str::to_string))?;
        let mut dependencies = BTreeSet::new();
        dec.read_collection(&mut dependencies, |d| d.read_hash())?;
        let ir = dec.read_bytes()?.to_vec();
        Ok(Self {
            declarations,
            dependencies,
            ir,
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("kiln_cache=trace")
        .with_test_writer()
        .try_init();
}

/// "Compiles" a source file, standing in for the front end.
fn compile(source: &str) -> FileState {
    FileState {
        declarations: source
            .split_whitespace()
            .filter(|w| w.starts_with("fun"))
            .map(str::to_string)
            .collect(),
        dependencies: BTreeSet::new(),
        ir: source.bytes().rev().collect(),
    }
}

struct Project {
    _tmp: tempfile::TempDir,
    sources: Vec<PathBuf>,
    config: CacheConfig,
}

impl Project {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let sources: Vec<PathBuf> = ["a.kt", "b.kt", "c.kt"]
            .iter()
            .map(|name| {
                let path = src.join(name);
                std::fs::write(&path, format!("fun_{name} body")).unwrap();
                path
            })
            .collect();
        let config = CacheConfig::new(tmp.path().join(".kiln-cache")).with_schema("fs-1");
        Self {
            _tmp: tmp,
            sources,
            config,
        }
    }

    /// Runs one build and returns how many files had to be compiled.
    fn build(&self) -> usize {
        let cache = RecordCache::<FileState>::open(&self.config).unwrap();
        let mut compiled = 0;
        for path in &self.sources {
            let key = ArtifactKey::for_file(path).unwrap();
            if cache.get(&key).is_none() {
                let source = std::fs::read_to_string(path).unwrap();
                cache.put(&key, &compile(&source)).unwrap();
                compiled += 1;
            }
        }
        compiled
    }
}

#[test]
fn full_workflow() {
    init_tracing();
    let project = Project::new();

    // First build: everything is new.
    assert_eq!(project.build(), 3);

    // Second build: nothing changed.
    assert_eq!(project.build(), 0);

    // Third build: one file edited.
    std::fs::write(&project.sources[0], "fun_a.kt edited body").unwrap();
    assert_eq!(project.build(), 1);

    // The stale entry for the old contents is still on disk until pruned.
    let cache = RecordCache::<FileState>::open(&project.config).unwrap();
    assert_eq!(cache.directory().list_entries().count(), 4);

    let live: BTreeSet<PathBuf> = project
        .sources
        .iter()
        .map(|p| cache.path_for(&ArtifactKey::for_file(p).unwrap()))
        .collect();
    let removed = cache.directory().prune(|p| !live.contains(p)).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(cache.directory().stats().entries, 3);

    // Pruning did not disturb live entries.
    assert_eq!(project.build(), 0);
}

#[test]
fn stored_record_is_unchanged() {
    init_tracing();
    let project = Project::new();
    let cache = RecordCache::<FileState>::open(&project.config).unwrap();
    let key = ArtifactKey::for_file(&project.sources[1]).unwrap();
    let record = FileState {
        declarations: vec!["fun_b".into(), "fun_b2".into()],
        dependencies: [b"x".as_slice(), b"y".as_slice()]
            .into_iter()
            .map(ContentHash::from_bytes)
            .collect(),
        ir: vec![],
    };
    cache.put(&key, &record).unwrap();
    assert_eq!(cache.get(&key), Some(record));
}

#[test]
fn crashed_write_never_yields_partial_record() {
    init_tracing();
    let project = Project::new();
    assert_eq!(project.build(), 3);

    let cache = RecordCache::<FileState>::open(&project.config).unwrap();
    let key = ArtifactKey::for_file(&project.sources[2]).unwrap();
    let previous = cache.get(&key).unwrap();
    let path = cache.path_for(&key);
    let original = std::fs::read(&path).unwrap();

    // Writer dies halfway through rewriting the entry.
    let result = write_atomically(&path, |out| {
        out.write_all(&original[..original.len() / 2])?;
        Err(std::io::Error::other("killed"))
    });
    assert!(result.is_err());
    let after = cache.get(&key);
    assert!(after.is_none() || after == Some(previous.clone()));

    // A file cut short behind our back, as after a power loss, is also a miss.
    std::fs::write(&path, &original[..original.len() / 2]).unwrap();
    assert_eq!(cache.get(&key), None);

    // The next build repairs the entry.
    assert_eq!(project.build(), 1);
    assert_eq!(cache.get(&key), Some(previous));
}

#[test]
fn invalidate_twice_succeeds() {
    init_tracing();
    let project = Project::new();
    project.build();
    let cache = RecordCache::<FileState>::open(&project.config).unwrap();
    let key = ArtifactKey::for_file(&project.sources[0]).unwrap();
    assert!(cache.invalidate(&key).unwrap());
    assert!(!cache.invalidate(&key).unwrap());
    assert_eq!(project.build(), 1);
}

#[test]
fn raw_payload_cache() {
    init_tracing();
    let project = Project::new();
    let cache = RecordCache::<Vec<u8>>::open(&project.config.clone().with_schema("raw")).unwrap();
    let key = ArtifactKey::for_content("blob", b"inputs");
    assert_eq!(cache.get(&key), None);
    cache.put(&key, &vec![1, 2, 3]).unwrap();
    assert_eq!(cache.get(&key), Some(vec![1, 2, 3]));
    assert!(cache.contains(&key));
}
