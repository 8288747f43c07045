/// Scanner module: orchestrates one cleanup scan.
///
/// Every mode starts with the same parallel walk ([`parallel::walk`]) and
/// then runs a mode-specific pass over its output:
///
/// - **Big files:** threshold applied inside the walk, then sorted and capped.
/// - **Duplicates:** staged size / partial-hash / full-hash grouping.
/// - **Empty folders:** bottom-up emptiness over the discovered directories.
///
/// A junk estimate is the exception: it walks each selected cleanup target
/// in turn instead of the request's roots.
///
/// [`start_scan`] runs a scan on a background thread and streams
/// [`ScanEvent`]s to the host; [`run_scan`] is the same driver on the
/// calling thread.
pub mod big_files;
pub mod cancel;
pub mod filter;
pub mod parallel;
pub mod progress;
pub mod queue;
pub mod sink;

use crate::analysis::clean_targets::{self, CleanTarget};
use crate::analysis::{duplicates, empty_dirs};
use crate::platform::disk_class::UNKNOWN_WORKERS;
use big_files::scan_big_files;
use cancel::CancellationToken;
use filter::PathFilter;
use parallel::{walk, WalkOptions};
use progress::{ScanEvent, ScanMode, ScanStage, ScanSummary};

use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;
use tracing::info;

/// Maximum number of events that may queue up in the channel.
///
/// If the host stops draining, the scanner stalls on `send` rather than
/// consuming unbounded heap.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Everything needed to run one scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub mode: ScanMode,
    /// Absolute root paths. Nested and duplicate roots are collapsed.
    pub roots: Vec<PathBuf>,
    /// Big-file threshold in bytes; in duplicate mode, the smallest file
    /// considered.
    pub min_size: u64,
    /// Maximum number of big files reported. `None` reports all.
    pub result_cap: Option<usize>,
    /// Path prefixes whose subtrees are never walked.
    pub exclusions: Vec<PathBuf>,
    /// Extensions (without the dot) of files to ignore entirely.
    pub skip_extensions: Vec<String>,
    pub worker_count: usize,
    /// Junk targets sized by [`ScanMode::CleanEstimate`]; unselected ones
    /// are skipped.
    pub clean_targets: Vec<CleanTarget>,
}

impl ScanRequest {
    pub fn new(mode: ScanMode, roots: Vec<PathBuf>) -> Self {
        Self {
            mode,
            roots,
            min_size: 0,
            result_cap: None,
            exclusions: Vec::new(),
            skip_extensions: Vec::new(),
            worker_count: UNKNOWN_WORKERS,
            clean_targets: clean_targets::default_clean_targets(),
        }
    }
}

/// Handle to a running or completed scan.
pub struct ScanHandle {
    /// Receiver for events from the scan thread.
    pub events: Receiver<ScanEvent>,
    cancel: CancellationToken,
    thread: Option<thread::JoinHandle<ScanSummary>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the scan's cancellation token, e.g. for a Ctrl+C handler.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the scan thread and return its summary.
    ///
    /// Returns `None` if the thread panicked. Events not yet received stay
    /// in the channel.
    pub fn join(mut self) -> Option<ScanSummary> {
        self.thread.take().and_then(|t| t.join().ok())
    }
}

/// Start a scan on a background thread.
pub fn start_scan(request: ScanRequest) -> ScanHandle {
    let (tx, rx) = crossbeam_channel::bounded::<ScanEvent>(PROGRESS_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    let thread = thread::Builder::new()
        .name("disktidy-scanner".into())
        .spawn(move || {
            run_scan(&request, &cancel_clone, |event| {
                // A dropped receiver just means nobody is listening any more.
                let _ = tx.send(event);
            })
        })
        .expect("failed to spawn scanner thread");

    ScanHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    }
}

/// Run one scan on the calling thread, reporting through `emit`.
///
/// The final event is always `Done` or `Cancelled`, carrying the same
/// summary that is returned.
pub fn run_scan<E>(request: &ScanRequest, cancel: &CancellationToken, emit: E) -> ScanSummary
where
    E: Fn(ScanEvent),
{
    let start = Instant::now();
    info!(
        "Starting {} scan of {:?} with {} worker(s)",
        request.mode.label(),
        request.roots,
        request.worker_count
    );

    let filter = PathFilter::new(&request.exclusions, &request.skip_extensions);
    let on_walk_progress = |visited| emit(ScanEvent::Progress { visited });

    let mut summary = ScanSummary {
        mode: request.mode,
        roots: request.roots.clone(),
        worker_count: request.worker_count.max(1),
        visited_files: 0,
        directories_listed: 0,
        matched: 0,
        reported: 0,
        reclaimable_bytes: 0,
        duration: Default::default(),
        finished_at: chrono::Local::now(),
        cancelled: false,
    };

    match request.mode {
        ScanMode::BigFiles => {
            let report = scan_big_files(
                &request.roots,
                &filter,
                request.min_size,
                request.result_cap,
                request.worker_count,
                cancel,
                on_walk_progress,
            );
            summary.visited_files = report.visited;
            summary.directories_listed = report.directories_listed;
            summary.matched = report.total_matches;
            summary.reported = report.files.len();
            summary.reclaimable_bytes = report.files.iter().map(|f| f.size).sum();
            summary.cancelled = report.cancelled;
            for file in report.files {
                emit(ScanEvent::FileFound(file));
            }
        }

        ScanMode::Duplicates => {
            let options = WalkOptions {
                worker_count: request.worker_count,
                min_size: request.min_size,
                collect_files: true,
                collect_directories: false,
                ..WalkOptions::default()
            };
            let out = walk(&request.roots, &filter, &options, cancel, on_walk_progress);
            summary.visited_files = out.visited;
            summary.directories_listed = out.directories_listed;
            summary.cancelled = out.cancelled;

            if !out.cancelled {
                let search = duplicates::find_duplicates_streaming(
                    out.files,
                    cancel,
                    |done, total| {
                        emit(ScanEvent::Stage {
                            stage: ScanStage::Hashing,
                            done,
                            total,
                        })
                    },
                    |group| emit(ScanEvent::DuplicateGroupFound(group.clone())),
                );
                summary.matched = search.groups.len();
                summary.reported = search.groups.len();
                summary.reclaimable_bytes =
                    search.groups.iter().map(|g| g.reclaimable_bytes()).sum();
                summary.cancelled = search.cancelled;
            }
        }

        ScanMode::EmptyDirs => {
            let options = WalkOptions {
                worker_count: request.worker_count,
                min_size: 0,
                collect_files: false,
                collect_directories: true,
                ..WalkOptions::default()
            };
            let out = walk(&request.roots, &filter, &options, cancel, on_walk_progress);
            summary.visited_files = out.visited;
            summary.directories_listed = out.directories_listed;
            summary.cancelled = out.cancelled;

            if !out.cancelled {
                let search = empty_dirs::find_empty_dirs_streaming(
                    out.directories,
                    cancel,
                    |done, total| {
                        emit(ScanEvent::Stage {
                            stage: ScanStage::CheckingDirectories,
                            done,
                            total,
                        })
                    },
                    |path| emit(ScanEvent::EmptyDirFound(path.to_path_buf())),
                );
                summary.matched = search.dirs.len();
                summary.reported = search.dirs.len();
                summary.cancelled = search.cancelled;
            }
        }

        ScanMode::CleanEstimate => {
            let result = clean_targets::estimate_targets(
                &request.clean_targets,
                request.worker_count,
                cancel,
                |done, total| {
                    emit(ScanEvent::Stage {
                        stage: ScanStage::Estimating,
                        done,
                        total,
                    })
                },
                |estimate| emit(ScanEvent::TargetEstimated(estimate.clone())),
            );
            summary.visited_files = result.estimates.iter().map(|e| e.files).sum();
            summary.matched = result.estimates.len();
            summary.reported = result.estimates.len();
            summary.reclaimable_bytes = result.total_bytes();
            summary.cancelled = result.cancelled;
        }
    }

    // Taken from the passes, not the token: a cancel that arrives after the
    // last pass finished leaves a complete result.
    summary.duration = start.elapsed();
    summary.finished_at = chrono::Local::now();

    info!(
        "{} scan {}: {} files visited, {} matched in {:?}",
        request.mode.label(),
        if summary.cancelled { "cancelled" } else { "complete" },
        summary.visited_files,
        summary.matched,
        summary.duration
    );

    if summary.cancelled {
        emit(ScanEvent::Cancelled(summary.clone()));
    } else {
        emit(ScanEvent::Done(summary.clone()));
    }
    summary
}
