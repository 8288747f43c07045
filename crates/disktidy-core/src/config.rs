/// Scan configuration, loaded from a JSON file.
///
/// Every field has a default, so an empty object `{}` (or no file at all)
/// is a valid configuration. Sizes are written the way users think of them,
/// e.g. `"min_size": "250 MB"`.
use crate::analysis::clean_targets::{default_clean_targets, CleanTarget};
use crate::error::{CoreError, Result};
use crate::model::size::parse_size;
use crate::platform::disk_class::{DiskClass, DiskClassCache, MediaProbe};
use crate::scanner::progress::ScanMode;
use crate::scanner::ScanRequest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Subtrees that are never worth cleaning and are slow to walk.
pub const DEFAULT_EXCLUDES: [&str; 5] = [
    r"C:\Windows\WinSxS",
    r"C:\Windows\Installer",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
    r"C:\ProgramData\Microsoft\Windows\WER\ReportArchive",
];

/// Drivers and similar files that must never be offered for deletion.
pub const DEFAULT_SKIP_EXTENSIONS: [&str; 1] = ["sys"];

pub const DEFAULT_MIN_SIZE: &str = "100 MB";
pub const DEFAULT_RESULT_CAP: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub roots: Vec<PathBuf>,
    /// Big-file threshold.
    pub min_size: String,
    /// Smallest file considered in duplicate mode.
    pub duplicate_min_size: String,
    /// Maximum number of big files reported; `null` reports all.
    pub result_cap: Option<usize>,
    pub exclusions: Vec<PathBuf>,
    pub skip_extensions: Vec<String>,
    /// Fixed worker count. When unset the count comes from the media type
    /// of the first root, or the CPU count if detection is disabled.
    pub workers: Option<usize>,
    pub detect_disk_class: bool,
    /// Write the results to this CSV file after the scan.
    pub report_csv: Option<PathBuf>,
    /// Junk targets for the `clean_estimate` mode. Replaces the built-in
    /// catalogue when given.
    pub clean_targets: Vec<CleanTarget>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::BigFiles,
            roots: vec![default_root()],
            min_size: DEFAULT_MIN_SIZE.to_owned(),
            duplicate_min_size: "1 B".to_owned(),
            result_cap: Some(DEFAULT_RESULT_CAP),
            exclusions: DEFAULT_EXCLUDES.iter().map(PathBuf::from).collect(),
            skip_extensions: DEFAULT_SKIP_EXTENSIONS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            workers: None,
            detect_disk_class: true,
            report_csv: None,
            clean_targets: default_clean_targets(),
        }
    }
}

#[cfg(windows)]
fn default_root() -> PathBuf {
    PathBuf::from(r"C:\")
}

#[cfg(not(windows))]
fn default_root() -> PathBuf {
    PathBuf::from("/")
}

impl ScanConfig {
    /// Read a configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text).map_err(|source| CoreError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Build a request for `mode`, sizing the pool from the system probe.
    pub fn to_request(&self, mode: ScanMode) -> Result<ScanRequest> {
        self.to_request_with(mode, &DiskClassCache::new())
    }

    /// Build a request for `mode`, sizing the pool with `cache`.
    pub fn to_request_with<P: MediaProbe>(
        &self,
        mode: ScanMode,
        cache: &DiskClassCache<P>,
    ) -> Result<ScanRequest> {
        let min_size = match mode {
            ScanMode::BigFiles => parse_size(&self.min_size)?,
            ScanMode::Duplicates => parse_size(&self.duplicate_min_size)?,
            ScanMode::EmptyDirs | ScanMode::CleanEstimate => 0,
        };
        let (worker_count, class) = self.resolve_workers(cache);
        if let Some(class) = class {
            info!("Media type {}: using {worker_count} worker(s)", class.label());
        }

        Ok(ScanRequest {
            mode,
            roots: self.roots.clone(),
            min_size,
            result_cap: self.result_cap,
            exclusions: self.exclusions.clone(),
            skip_extensions: self.skip_extensions.clone(),
            worker_count,
            clean_targets: self.clean_targets.clone(),
        })
    }

    /// Worker count, plus the detected media type when detection ran.
    fn resolve_workers<P: MediaProbe>(
        &self,
        cache: &DiskClassCache<P>,
    ) -> (usize, Option<DiskClass>) {
        if let Some(n) = self.workers {
            return (n.max(1), None);
        }
        match (self.detect_disk_class, self.roots.first()) {
            (true, Some(root)) => {
                let (n, class) = cache.choose_worker_count(root);
                (n, Some(class))
            }
            _ => (num_cpus::get().max(1), None),
        }
    }
}
