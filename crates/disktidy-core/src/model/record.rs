/// Records produced by a scan.
///
/// All records are plain owned values. They are created once by the worker
/// that discovers them and never mutated afterwards, so they can be moved
/// between threads and channels freely.
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One regular file discovered by the walker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileRecord {
    /// Logical file size in bytes.
    pub size: u64,
    /// Full path of the file.
    pub path: PathBuf,
}

impl FileRecord {
    pub fn new(size: u64, path: PathBuf) -> Self {
        Self { size, path }
    }

    /// File name component, or the full path if there is none.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// One unit of walk work: a directory waiting to be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTask {
    pub path: PathBuf,
}

impl DirectoryTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A maximal set of files sharing identical content.
///
/// Only ever constructed with two or more members, all of the same size and
/// the same full-content hash. Members are ordered by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Sequential id, starting at 1, in emission order.
    pub id: u64,
    /// Size of each member in bytes.
    pub size: u64,
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Bytes freed by keeping one copy and deleting the rest.
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size
            .saturating_mul(self.members.len().saturating_sub(1) as u64)
    }
}
