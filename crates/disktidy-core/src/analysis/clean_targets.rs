/// Junk-cleanup targets and their size estimates.
///
/// A target is a well-known place where Windows and common applications
/// leave caches, logs and crash dumps: the temp folders, shader caches,
/// browser caches, the Windows Update download cache, and so on. Each one
/// is either a whole directory tree, a single file, or the files directly
/// inside a directory whose names match a pattern (`thumbcache*.db`).
///
/// This module only measures targets. Directory targets are sized with the
/// same parallel walk as every other scan, so symlinks are not followed and
/// unreadable entries are skipped. Deleting is left to the host.
use crate::model::size::format_size;
use crate::scanner::cancel::CancellationToken;
use crate::scanner::filter::PathFilter;
use crate::scanner::parallel::{walk, WalkOptions};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What part of a target's path is junk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
    /// Everything beneath the directory (the directory itself is kept).
    Directory,
    /// The file itself.
    File,
    /// Files directly inside the directory whose names match `pattern`,
    /// compared case-insensitively.
    Glob { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanTarget {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: TargetKind,
    /// Estimated (and offered for cleaning) only when selected. Targets that
    /// are safe to clear start selected.
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub note: String,
}

impl CleanTarget {
    pub fn directory(name: &str, path: PathBuf, selected: bool, note: &str) -> Self {
        Self::new(name, path, TargetKind::Directory, selected, note)
    }

    pub fn file(name: &str, path: PathBuf, selected: bool, note: &str) -> Self {
        Self::new(name, path, TargetKind::File, selected, note)
    }

    pub fn glob(name: &str, path: PathBuf, pattern: &str, selected: bool, note: &str) -> Self {
        let kind = TargetKind::Glob {
            pattern: pattern.to_owned(),
        };
        Self::new(name, path, kind, selected, note)
    }

    fn new(name: &str, path: PathBuf, kind: TargetKind, selected: bool, note: &str) -> Self {
        Self {
            name: name.to_owned(),
            path,
            kind,
            selected,
            note: note.to_owned(),
        }
    }
}

/// Size of one target at the time it was measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEstimate {
    pub name: String,
    pub path: PathBuf,
    /// Whether the target's path exists at all.
    pub exists: bool,
    /// Regular files that would be removed.
    pub files: u64,
    pub bytes: u64,
}

/// Outcome of an estimation pass.
#[derive(Debug, Default)]
pub struct CleanEstimate {
    /// One entry per selected target, in catalogue order.
    pub estimates: Vec<TargetEstimate>,
    /// Cancellation stopped the pass before every selected target was sized.
    pub cancelled: bool,
}

impl CleanEstimate {
    pub fn total_bytes(&self) -> u64 {
        self.estimates.iter().map(|e| e.bytes).sum()
    }
}

/// The built-in catalogue, resolved against this machine's environment.
///
/// Targets under `%LOCALAPPDATA%` are left out when that variable is unset.
pub fn default_clean_targets() -> Vec<CleanTarget> {
    let sys = env_dir("SystemRoot", r"C:\Windows");
    let program_data = env_dir("PROGRAMDATA", r"C:\ProgramData");

    let mut targets = vec![
        CleanTarget::directory("User temp files", env::temp_dir(), true, "Common junk, safe"),
        CleanTarget::directory("System temp files", sys.join("Temp"), true, "May need administrator"),
        CleanTarget::directory("Prefetch", sys.join("Prefetch"), false, "Slows the next first launch"),
        CleanTarget::directory("CBS logs", sys.join(r"Logs\CBS"), true, "Fairly safe"),
        CleanTarget::directory("DISM logs", sys.join(r"Logs\DISM"), true, "Fairly safe"),
        CleanTarget::directory("LiveKernelReports", sys.join("LiveKernelReports"), true, "Kernel dumps"),
        CleanTarget::directory(
            "Error reports (system)",
            sys.join(r"System32\config\systemprofile\AppData\Local\Microsoft\Windows\WER"),
            false,
            "Needs administrator",
        ),
        CleanTarget::directory("Minidump", sys.join("Minidump"), true, "Crash dumps"),
        CleanTarget::file("MEMORY.DMP", sys.join("MEMORY.DMP"), false, "Only if not debugging"),
        CleanTarget::directory(
            "NVIDIA NV_Cache",
            program_data.join(r"NVIDIA Corporation\NV_Cache"),
            false,
            "NVIDIA compute cache",
        ),
        CleanTarget::directory(
            "Windows Update downloads",
            sys.join(r"SoftwareDistribution\Download"),
            false,
            "Update cache",
        ),
        CleanTarget::directory(
            "Delivery Optimization",
            sys.join(r"SoftwareDistribution\DeliveryOptimization"),
            false,
            "Needs administrator",
        ),
    ];

    if let Some(local) = env::var_os("LOCALAPPDATA").map(PathBuf::from) {
        let dir = |name: &str, rel: &str, selected: bool, note: &str| {
            CleanTarget::directory(name, local.join(rel), selected, note)
        };
        targets.extend([
            dir("Error reports (user)", r"Microsoft\Windows\WER", true, "Crash reports"),
            CleanTarget::glob(
                "Thumbnail cache",
                local.join(r"Microsoft\Windows\Explorer"),
                "thumbcache*.db",
                true,
                "Rebuilt on demand",
            ),
            dir("D3D shader cache", "D3DSCache", false, "Direct3D shader cache"),
            dir("NVIDIA DX cache", r"NVIDIA\DXCache", false, "NVIDIA shader cache"),
            dir("NVIDIA GL cache", r"NVIDIA\GLCache", false, "NVIDIA OpenGL cache"),
            dir("NVIDIA compute cache", r"NVIDIA\ComputeCache", false, "CUDA"),
            dir("AMD DX cache", r"AMD\DxCache", false, "AMD shader cache"),
            dir("AMD GL cache", r"AMD\GLCache", false, "AMD OpenGL cache"),
            dir("Steam shader cache", r"Steam\steamapps\shadercache", false, "Steam"),
            dir("Steam download leftovers", r"Steam\steamapps\downloading", false, "Steam"),
            dir("Edge cache", r"Microsoft\Edge\User Data\Default\Cache", false, "Browser"),
            dir("Edge code cache", r"Microsoft\Edge\User Data\Default\Code Cache", false, "JavaScript"),
            dir("Chrome cache", r"Google\Chrome\User Data\Default\Cache", false, "Browser"),
            dir("Chrome code cache", r"Google\Chrome\User Data\Default\Code Cache", false, "JavaScript"),
            dir("pip cache", r"pip\Cache", true, "Python"),
            dir("NuGet cache", r"NuGet\v3-cache", true, ".NET"),
        ]);
    }
    targets
}

fn env_dir(var: &str, fallback: &str) -> PathBuf {
    env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(fallback))
}

/// Measure every selected target in order.
///
/// `on_progress(done, total)` fires after each target and `on_estimate`
/// receives each finished estimate. A target whose walk is cancelled is
/// dropped rather than reported with a partial size.
pub fn estimate_targets<F, G>(
    targets: &[CleanTarget],
    worker_count: usize,
    cancel: &CancellationToken,
    mut on_progress: F,
    mut on_estimate: G,
) -> CleanEstimate
where
    F: FnMut(usize, usize),
    G: FnMut(&TargetEstimate),
{
    let selected: Vec<&CleanTarget> = targets.iter().filter(|t| t.selected).collect();
    let total = selected.len();
    let mut result = CleanEstimate::default();
    on_progress(0, total);

    for (done, target) in selected.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let Some(estimate) = estimate_target(target, worker_count, cancel) else {
            break;
        };
        info!("Estimated {}: {}", target.name, format_size(estimate.bytes));
        on_estimate(&estimate);
        result.estimates.push(estimate);
        on_progress(done + 1, total);
    }

    result.cancelled = result.estimates.len() < total;
    result
}

/// Size one target. `None` if cancellation interrupted it.
pub fn estimate_target(
    target: &CleanTarget,
    worker_count: usize,
    cancel: &CancellationToken,
) -> Option<TargetEstimate> {
    let mut estimate = TargetEstimate {
        name: target.name.clone(),
        path: target.path.clone(),
        exists: false,
        files: 0,
        bytes: 0,
    };

    match &target.kind {
        TargetKind::Directory => {
            if !target.path.is_dir() {
                return Some(estimate);
            }
            estimate.exists = true;
            let options = WalkOptions {
                worker_count,
                collect_files: false,
                ..WalkOptions::default()
            };
            let out = walk(
                std::slice::from_ref(&target.path),
                &PathFilter::default(),
                &options,
                cancel,
                |_| {},
            );
            if out.cancelled {
                return None;
            }
            estimate.files = out.visited;
            estimate.bytes = out.bytes;
        }

        TargetKind::File => {
            if let Ok(meta) = fs::metadata(&target.path) {
                if meta.is_file() {
                    estimate.exists = true;
                    estimate.files = 1;
                    estimate.bytes = meta.len();
                }
            }
        }

        TargetKind::Glob { pattern } => {
            if target.path.is_dir() {
                estimate.exists = true;
                let (files, bytes) = matching_files(&target.path, pattern);
                estimate.files = files;
                estimate.bytes = bytes;
            }
        }
    }
    Some(estimate)
}

/// Count and size the files directly inside `dir` matching `pattern`.
fn matching_files(dir: &Path, pattern: &str) -> (u64, u64) {
    let pattern = match Pattern::new(pattern) {
        Ok(p) => p,
        Err(err) => {
            warn!("Invalid target pattern '{pattern}': {err}");
            return (0, 0);
        }
    };
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Cannot list {}: {err}", dir.display());
            return (0, 0);
        }
    };

    let mut files = 0;
    let mut bytes = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !pattern.matches_with(&name.to_string_lossy(), options) {
            continue;
        }
        match entry.metadata() {
            Ok(meta) if meta.is_file() => {
                files += 1;
                bytes += meta.len();
            }
            _ => {}
        }
    }
    (files, bytes)
}
