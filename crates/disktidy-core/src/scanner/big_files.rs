/// Oversized-file discovery.
///
/// Runs one walk with the size threshold pushed down into the workers (files
/// below it are counted but never collected), then orders the matches
/// largest first and applies the optional result cap.
use crate::model::FileRecord;
use crate::scanner::cancel::CancellationToken;
use crate::scanner::filter::PathFilter;
use crate::scanner::parallel::{walk, WalkOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Result of a big-file scan.
#[derive(Debug, Default)]
pub struct BigFileReport {
    /// Matches sorted by size descending, truncated to the cap.
    pub files: Vec<FileRecord>,
    /// Matches found before the cap was applied.
    pub total_matches: usize,
    pub visited: u64,
    pub directories_listed: u64,
    pub cancelled: bool,
    pub duration: Duration,
}

/// Find every file of at least `min_size` bytes under `roots`.
pub fn scan_big_files<F>(
    roots: &[PathBuf],
    filter: &PathFilter,
    min_size: u64,
    result_cap: Option<usize>,
    worker_count: usize,
    cancel: &CancellationToken,
    on_progress: F,
) -> BigFileReport
where
    F: FnMut(u64),
{
    let options = WalkOptions {
        worker_count,
        min_size,
        collect_files: true,
        collect_directories: false,
        ..WalkOptions::default()
    };
    let out = walk(roots, filter, &options, cancel, on_progress);

    let mut files = out.files;
    sort_largest_first(&mut files);
    let total_matches = files.len();
    if let Some(cap) = result_cap {
        files.truncate(cap);
    }

    BigFileReport {
        files,
        total_matches,
        visited: out.visited,
        directories_listed: out.directories_listed,
        cancelled: out.cancelled,
        duration: out.duration,
    }
}

/// Size descending; equal sizes ordered by path so repeated scans agree.
pub fn sort_largest_first(files: &mut [FileRecord]) {
    files.sort_unstable_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
}
