/// Empty-directory detection.
///
/// A directory is empty when it holds nothing but directories that are
/// themselves empty. Deciding that bottom-up needs each child's answer before
/// its parent's, which normally means building a tree. Instead, directories
/// are visited in order of **descending path length**: a subdirectory's path
/// is always strictly longer than its parent's, so every child has been
/// decided before its parent is looked at. Directories of equal length can
/// never contain one another, so their relative order does not matter.
///
/// Each directory is listed once. Any non-directory entry (file, symlink,
/// device) or any subdirectory not already confirmed empty makes it
/// non-empty. Subdirectories that the walk never recorded, because they were
/// excluded or unreadable, are therefore never confirmed and conservatively
/// keep their parent non-empty too.
use crate::scanner::cancel::CancellationToken;
use crate::scanner::sink::ProgressThrottle;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};

/// Outcome of an empty-directory pass.
#[derive(Debug, Default)]
pub struct EmptyDirSearch {
    /// Empty directories, deepest first.
    pub dirs: Vec<PathBuf>,
    /// Cancellation stopped the pass before every directory was checked.
    pub cancelled: bool,
}

/// Return every empty directory among `dirs`, deepest first.
///
/// `on_progress(checked, total)` is rate-limited to the scan progress
/// interval and always fires once at the end.
pub fn find_empty_dirs<F>(
    dirs: Vec<PathBuf>,
    cancel: &CancellationToken,
    on_progress: F,
) -> Vec<PathBuf>
where
    F: FnMut(usize, usize),
{
    find_empty_dirs_streaming(dirs, cancel, on_progress, |_| {}).dirs
}

/// Like [`find_empty_dirs`], additionally handing each empty directory to
/// `on_found` as soon as it is confirmed.
pub fn find_empty_dirs_streaming<F, G>(
    mut dirs: Vec<PathBuf>,
    cancel: &CancellationToken,
    mut on_progress: F,
    mut on_found: G,
) -> EmptyDirSearch
where
    F: FnMut(usize, usize),
    G: FnMut(&Path),
{
    let start = Instant::now();
    dirs.sort_unstable_by(|a, b| {
        b.as_os_str()
            .len()
            .cmp(&a.as_os_str().len())
            .then_with(|| a.cmp(b))
    });
    dirs.dedup();
    let total = dirs.len();

    let mut confirmed: HashSet<PathBuf> = HashSet::new();
    let mut found = Vec::new();
    let mut throttle = ProgressThrottle::default();
    let mut checked = 0usize;

    for dir in dirs {
        if cancel.is_cancelled() {
            break;
        }
        checked += 1;

        if is_empty(&dir, &confirmed) {
            on_found(&dir);
            found.push(dir.clone());
            confirmed.insert(dir);
        }

        if throttle.ready() {
            on_progress(checked, total);
        }
    }
    on_progress(checked, total);
    let cancelled = checked < total;

    debug!(
        "Empty-directory pass: {} of {} directories empty ({} checked) in {:?}",
        found.len(),
        total,
        checked,
        start.elapsed()
    );
    EmptyDirSearch {
        dirs: found,
        cancelled,
    }
}

fn is_empty(dir: &Path, confirmed: &HashSet<PathBuf>) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            trace!("Cannot list {}: {err}", dir.display());
            return false;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            return false;
        };
        let Ok(file_type) = entry.file_type() else {
            return false;
        };
        if !file_type.is_dir() || !confirmed.contains(&entry.path()) {
            return false;
        }
    }
    true
}
