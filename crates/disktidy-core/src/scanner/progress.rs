/// Scan events: lightweight messages sent from the scan thread to the host
/// via a crossbeam channel.
use crate::analysis::clean_targets::TargetEstimate;
use crate::model::{DuplicateGroup, FileRecord};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which cleanup feature a scan serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Files at or above a size threshold, largest first.
    #[default]
    BigFiles,
    /// Groups of files with identical content.
    Duplicates,
    /// Directories containing nothing but empty directories.
    EmptyDirs,
    /// Sizes of the selected junk-cleanup targets.
    CleanEstimate,
}

impl ScanMode {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::BigFiles => "Big files",
            Self::Duplicates => "Duplicate files",
            Self::EmptyDirs => "Empty folders",
            Self::CleanEstimate => "Junk estimate",
        }
    }
}

/// Post-walk processing phase reported through [`ScanEvent::Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanStage {
    /// Hashing duplicate candidates; counted in size groups.
    Hashing,
    /// Checking directories for emptiness; counted in directories.
    CheckingDirectories,
    /// Sizing junk-cleanup targets; counted in targets.
    Estimating,
}

/// Updates sent from the scan thread to the host.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Periodic walk update (~300 ms) with the running visited-file count.
    Progress { visited: u64 },
    /// Post-walk progress.
    Stage {
        stage: ScanStage,
        done: usize,
        total: usize,
    },
    /// A big file, in final (largest-first) order.
    FileFound(FileRecord),
    /// A confirmed duplicate group.
    DuplicateGroupFound(DuplicateGroup),
    /// An empty directory; children always arrive before their parents.
    EmptyDirFound(PathBuf),
    /// One junk-cleanup target has been sized.
    TargetEstimated(TargetEstimate),
    /// Scan finished normally.
    Done(ScanSummary),
    /// Scan was cancelled; the results already sent are a valid subset.
    Cancelled(ScanSummary),
}

impl ScanEvent {
    /// `true` for `Done` and `Cancelled`, after which nothing else is sent.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Cancelled(_))
    }
}

/// Totals for one scan, sent with the terminal event.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub mode: ScanMode,
    pub roots: Vec<PathBuf>,
    pub worker_count: usize,
    /// Regular files stat'd by the walk (skipped extensions and excluded
    /// subtrees not included). A junk estimate counts files inside targets.
    pub visited_files: u64,
    pub directories_listed: u64,
    /// Big files above the threshold, duplicate groups, empty directories,
    /// or estimated targets.
    pub matched: usize,
    /// How many of `matched` were sent as events (big files honour the cap).
    pub reported: usize,
    /// Bytes that deleting the reported items would free.
    pub reclaimable_bytes: u64,
    pub duration: Duration,
    pub finished_at: DateTime<Local>,
    pub cancelled: bool,
}
