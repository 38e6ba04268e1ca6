//! Replace-on-write file access for cache files.
//!
//! A cache file is always written from scratch: any previous file at the path
//! is removed first, fresh content is streamed in, and the stream is flushed
//! before returning. If the writer fails, the partial file is removed so the
//! path is left absent rather than truncated.
//!
//! This is not crash-atomic. A process killed mid-write can leave a missing or
//! short file behind; the artifact header checksum turns either case into a
//! cache miss on the next read. Writing to a temporary file and renaming it
//! over the target would close that window.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::CacheError;

/// Writes `path` from scratch using `writer`.
///
/// Parent directories are created as needed. On success the file holds
/// exactly what `writer` produced; on failure the file does not exist.
pub fn write_atomically<F>(path: &Path, writer: F) -> Result<(), CacheError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let write_err = |source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    remove_if_exists(path)?;

    let file = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    let result = writer(&mut out).and_then(|()| out.flush());
    drop(out);

    if let Err(err) = result {
        remove_best_effort(path, "write_atomically.writer_failed");
        return Err(write_err(err));
    }
    Ok(())
}

/// Opens `path` for reading if it exists.
///
/// Returns `Ok(None)` when there is no file. Other I/O failures are errors.
pub fn read_if_exists<T, F>(path: &Path, reader: F) -> Result<Option<T>, CacheError>
where
    F: FnOnce(&mut BufReader<File>) -> T,
{
    match File::open(path) {
        Ok(file) => {
            let mut input = BufReader::new(file);
            Ok(Some(reader(&mut input)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CacheError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Deletes `path` if present. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CacheError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn remove_best_effort(path: &Path, reason: &'static str) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove cache file"
            );
        }
    }
}

/// Removes `path` if it is an empty directory. A directory that still holds
/// files is left alone; any other failure is logged and ignored.
pub(crate) fn remove_empty_dir_best_effort(path: &Path) {
    if let Err(err) = fs::remove_dir(path) {
        if !matches!(
            err.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
        ) {
            tracing::debug!(
                path = %path.display(),
                error = %err,
                "failed to remove cache directory"
            );
        }
    }
}
