/// Parallel directory walker: a fixed pool of symmetric worker threads.
///
/// There is no dedicated producer. Every worker takes one directory from the
/// shared [`ScanQueue`], lists it non-recursively, pushes each subdirectory
/// back onto the queue, and merges what it found into the [`ResultSink`].
/// A thread that finishes a small subtree immediately picks up directories
/// discovered by a sibling stuck in a large one, so load balances itself
/// without knowing the shape of the tree up front.
///
/// The calling thread acts as the driver: it seeds the queue, waits for the
/// drained signal in short slices (reporting the visited count once per
/// progress interval), then closes the queue and joins the pool.
///
/// # Cancellation
///
/// The token is polled before every pop, before each directory is listed,
/// every [`CANCEL_POLL_ENTRIES`] entries within a listing, and by the driver
/// on every [`DRIVER_TICK`]. A cancelled walk therefore returns within one
/// directory listing. Results merged before that point are returned as a
/// valid partial result.
use crate::model::{DirectoryTask, FileRecord};
use crate::scanner::cancel::CancellationToken;
use crate::scanner::filter::PathFilter;
use crate::scanner::queue::{Pop, ScanQueue};
use crate::scanner::sink::{LocalBatch, ProgressThrottle, ResultSink, PROGRESS_INTERVAL};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// How long an idle worker waits on the queue before re-checking cancellation.
const POP_TIMEOUT: Duration = Duration::from_millis(50);

/// How long the driver blocks on the drained signal before re-checking
/// cancellation.
pub const DRIVER_TICK: Duration = Duration::from_millis(10);

/// Entries listed between cancellation checks inside one directory.
pub const CANCEL_POLL_ENTRIES: usize = 1024;

/// What the walk should collect.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Number of worker threads. Zero is treated as one.
    pub worker_count: usize,
    /// Files smaller than this are counted as visited but not collected.
    pub min_size: u64,
    /// Collect [`FileRecord`]s at all (big-file and duplicate modes).
    pub collect_files: bool,
    /// Collect every discovered subdirectory (empty-directory mode).
    pub collect_directories: bool,
    /// Minimum gap between two progress callbacks.
    pub progress_interval: Duration,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            worker_count: 4,
            min_size: 0,
            collect_files: true,
            collect_directories: false,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// Raw output of one walk. No ordering guarantee.
#[derive(Debug, Default)]
pub struct WalkOutput {
    pub files: Vec<FileRecord>,
    /// Subdirectories discovered beneath the roots (roots themselves excluded).
    pub directories: Vec<PathBuf>,
    /// Regular files stat'd, excluding skipped extensions and excluded subtrees.
    pub visited: u64,
    /// Total size of the visited files, collected or not.
    pub bytes: u64,
    pub directories_listed: u64,
    /// `true` only when cancellation left part of the tree unlisted.
    pub cancelled: bool,
    pub duration: Duration,
}

/// Everything a worker needs, scoped to a single walk.
struct ScanContext<'a> {
    queue: ScanQueue,
    sink: ResultSink,
    filter: &'a PathFilter,
    cancel: &'a CancellationToken,
    options: &'a WalkOptions,
}

/// Walk every root with a pool of `options.worker_count` threads.
///
/// `on_progress` is called on the calling thread with the running visited
/// count at most once per `options.progress_interval`, and once more at the
/// end.
pub fn walk<F>(
    roots: &[PathBuf],
    filter: &PathFilter,
    options: &WalkOptions,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> WalkOutput
where
    F: FnMut(u64),
{
    let start = Instant::now();
    let roots = filter.normalize_roots(roots);
    let worker_count = options.worker_count.max(1);

    let ctx = ScanContext {
        queue: ScanQueue::new(),
        sink: ResultSink::new(),
        filter,
        cancel,
        options,
    };
    for root in &roots {
        ctx.queue.push(DirectoryTask::new(root.clone()));
    }

    info!(
        "Walking {} root(s) with {} worker(s), min size {} bytes",
        roots.len(),
        worker_count,
        options.min_size
    );

    let drained = thread::scope(|scope| {
        for i in 0..worker_count {
            let ctx = &ctx;
            thread::Builder::new()
                .name(format!("disktidy-walker-{i}"))
                .spawn_scoped(scope, move || worker_loop(ctx))
                .expect("failed to spawn walker thread");
        }

        let mut throttle = ProgressThrottle::new(options.progress_interval);
        let drained = loop {
            if cancel.is_cancelled() {
                // Finished tasks only; skipped ones mark their batch interrupted.
                break ctx.queue.is_drained();
            }
            if ctx.queue.wait_drained(DRIVER_TICK) {
                break true;
            }
            if throttle.ready() {
                on_progress(ctx.sink.visited());
            }
        };

        // Wakes every worker; the scope joins them on exit.
        ctx.queue.close();
        drained
    });

    let collected = ctx.sink.into_collected();
    // A cancel that lands after the last listing does not make the walk partial.
    let cancelled = !drained || collected.interrupted;
    on_progress(collected.visited);

    let duration = start.elapsed();
    debug!(
        "Walk finished: {} files visited, {} dirs listed, {} files kept in {:?}{}",
        collected.visited,
        collected.directories_listed,
        collected.files.len(),
        duration,
        if cancelled { " (cancelled)" } else { "" }
    );

    WalkOutput {
        files: collected.files,
        directories: collected.directories,
        visited: collected.visited,
        bytes: collected.bytes,
        directories_listed: collected.directories_listed,
        cancelled,
        duration,
    }
}

fn worker_loop(ctx: &ScanContext<'_>) {
    loop {
        if ctx.cancel.is_cancelled() {
            return;
        }
        match ctx.queue.pop(POP_TIMEOUT) {
            Pop::Closed => return,
            Pop::Idle => continue,
            Pop::Task(task) => {
                let batch = if ctx.cancel.is_cancelled() {
                    LocalBatch {
                        interrupted: true,
                        ..LocalBatch::default()
                    }
                } else {
                    list_directory(ctx, &task)
                };
                ctx.sink.merge(batch);
                ctx.queue.task_done();
            }
        }
    }
}

/// List one directory, pushing subdirectories and batching file records.
///
/// Every I/O failure is local: an unreadable directory yields an empty
/// batch, an unreadable entry is skipped.
fn list_directory(ctx: &ScanContext<'_>, task: &DirectoryTask) -> LocalBatch {
    let mut batch = LocalBatch::default();

    let entries = match fs::read_dir(task.path()) {
        Ok(entries) => entries,
        Err(err) => {
            trace!("Cannot list {}: {err}", task.path().display());
            return batch;
        }
    };
    batch.listed = true;

    for (i, entry) in entries.enumerate() {
        if i > 0 && i % CANCEL_POLL_ENTRIES == 0 && ctx.cancel.is_cancelled() {
            batch.interrupted = true;
            break;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                trace!("Bad entry in {}: {err}", task.path().display());
                continue;
            }
        };

        // `DirEntry::file_type` does not traverse links.
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                trace!("Cannot read type of {}: {err}", entry.path().display());
                continue;
            }
        };
        if file_type.is_symlink() {
            continue;
        }

        if file_type.is_dir() {
            let path = entry.path();
            if ctx.filter.is_excluded(&path) {
                continue;
            }
            if ctx.options.collect_directories {
                batch.directories.push(path.clone());
            }
            ctx.queue.push(DirectoryTask::new(path));
        } else if file_type.is_file() {
            if ctx.filter.skips_extension(&entry.file_name()) {
                continue;
            }
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    trace!("Cannot stat {}: {err}", entry.path().display());
                    continue;
                }
            };
            batch.visited += 1;
            batch.bytes += size;
            if ctx.options.collect_files && size >= ctx.options.min_size {
                batch.files.push(FileRecord::new(size, entry.path()));
            }
        }
    }

    batch
}
