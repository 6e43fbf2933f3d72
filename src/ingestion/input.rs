//! Named input streams and helpers to gather them from disk.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{MergeError, MergeResult};

use super::unified::FormatRegistry;

enum Source {
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
}

/// A named, sized byte stream supplied by the caller.
///
/// The name is only used to pick a parser by suffix; the size is only used for display. The
/// bytes are read once, by the parser the name resolves to. Path-backed inputs are opened
/// lazily, so a missing file surfaces as a per-file I/O failure during the merge.
pub struct InputFile {
    name: String,
    size_bytes: u64,
    source: Source,
}

impl InputFile {
    /// Input backed by a file on disk. The display name is the path's file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self {
            name,
            size_bytes,
            source: Source::Path(path.to_path_buf()),
        }
    }

    /// Input backed by an in-memory buffer (e.g. an uploaded file).
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            source: Source::Reader(Box::new(Cursor::new(bytes))),
        }
    }

    /// Input backed by an arbitrary reader, consumed incrementally.
    pub fn from_reader(name: impl Into<String>, size_bytes: u64, reader: impl Read + Send + 'static) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            source: Source::Reader(Box::new(reader)),
        }
    }

    /// Declared file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Size in megabytes, rounded to two decimals, for file listings.
    pub fn size_mb(&self) -> f64 {
        (self.size_bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
    }

    /// Open the underlying stream. Consumes the input: each stream is read exactly once.
    pub fn into_reader(self) -> MergeResult<Box<dyn Read + Send>> {
        match self.source {
            Source::Path(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            Source::Reader(reader) => Ok(reader),
        }
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Path(p) => p.display().to_string(),
            Source::Reader(_) => "<reader>".to_string(),
        };
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("source", &source)
            .finish()
    }
}

/// Collect inputs matching a glob pattern, in the pattern's (alphabetical) order.
///
/// Only files whose name resolves in `registry` are returned; unreadable glob entries are
/// reported as I/O errors.
pub fn inputs_from_glob(pattern: &str, registry: &FormatRegistry) -> MergeResult<Vec<InputFile>> {
    let paths = glob::glob(pattern).map_err(|e| MergeError::malformed(format!("invalid glob pattern '{pattern}': {e}")))?;

    let mut inputs = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| MergeError::Io(e.into()))?;
        if path.is_file() && accepts(&path, registry) {
            inputs.push(InputFile::from_path(path));
        }
    }
    Ok(inputs)
}

/// Collect inputs under `dir` (recursively), sorted by file name within each directory.
pub fn inputs_from_dir(dir: impl AsRef<Path>, registry: &FormatRegistry) -> MergeResult<Vec<InputFile>> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| MergeError::Io(e.into()))?;
        if entry.file_type().is_file() && accepts(entry.path(), registry) {
            inputs.push(InputFile::from_path(entry.path()));
        }
    }
    Ok(inputs)
}

fn accepts(path: &Path, registry: &FormatRegistry) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| registry.resolve(n).is_some())
}
