/// Shared result accumulator for one walk.
///
/// # Lock-contention mitigation
///
/// Workers never touch the shared lists per file. Each worker fills a
/// [`LocalBatch`] while listing one directory (all I/O happens here, with no
/// lock held) and then merges the whole batch with a **single lock
/// acquisition per list**. The visited counter is a plain atomic so the
/// progress poller never contends with the workers.
use crate::model::FileRecord;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cadence at which progress callbacks are delivered.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(300);

/// Results gathered by one worker from one directory listing.
#[derive(Debug, Default)]
pub struct LocalBatch {
    pub files: Vec<FileRecord>,
    pub directories: Vec<PathBuf>,
    /// Regular files stat'd in this directory (matching or not).
    pub visited: u64,
    /// Total size of those files.
    pub bytes: u64,
    /// Whether the directory could be listed at all.
    pub listed: bool,
    /// Cancellation cut the listing short, or skipped it entirely.
    pub interrupted: bool,
}

impl LocalBatch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.directories.is_empty()
            && self.visited == 0
            && !self.listed
            && !self.interrupted
    }
}

/// Everything a finished walk accumulated.
#[derive(Debug, Default)]
pub struct Collected {
    pub files: Vec<FileRecord>,
    pub directories: Vec<PathBuf>,
    pub visited: u64,
    pub bytes: u64,
    pub directories_listed: u64,
    /// At least one directory was not fully listed.
    pub interrupted: bool,
}

#[derive(Debug, Default)]
pub struct ResultSink {
    files: Mutex<Vec<FileRecord>>,
    directories: Mutex<Vec<PathBuf>>,
    visited: AtomicU64,
    bytes: AtomicU64,
    directories_listed: AtomicU64,
    interrupted: AtomicBool,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one worker batch into the shared state.
    pub fn merge(&self, batch: LocalBatch) {
        if batch.is_empty() {
            return;
        }
        if !batch.files.is_empty() {
            self.files.lock().extend(batch.files);
        }
        if !batch.directories.is_empty() {
            self.directories.lock().extend(batch.directories);
        }
        if batch.visited > 0 {
            self.visited.fetch_add(batch.visited, Ordering::Relaxed);
            self.bytes.fetch_add(batch.bytes, Ordering::Relaxed);
        }
        if batch.listed {
            self.directories_listed.fetch_add(1, Ordering::Relaxed);
        }
        if batch.interrupted {
            self.interrupted.store(true, Ordering::Relaxed);
        }
    }

    pub fn visited(&self) -> u64 {
        self.visited.load(Ordering::Relaxed)
    }

    /// Consume the sink once all workers have been joined.
    pub fn into_collected(self) -> Collected {
        Collected {
            files: self.files.into_inner(),
            directories: self.directories.into_inner(),
            visited: self.visited.into_inner(),
            bytes: self.bytes.into_inner(),
            directories_listed: self.directories_listed.into_inner(),
            interrupted: self.interrupted.into_inner(),
        }
    }
}

/// Rate-limits a progress callback to one call per interval.
///
/// Used by the post-processing passes, which advance in small steps and
/// would otherwise flood the host with updates.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// `true` if enough time has passed since the last accepted tick.
    /// The first tick is always accepted.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}
