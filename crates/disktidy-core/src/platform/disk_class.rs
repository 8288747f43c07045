/// Storage-media heuristic for sizing the walker pool.
///
/// Solid-state drives serve many concurrent directory listings without
/// penalty, so a wide pool helps. On a spinning disk every extra thread adds
/// head seeks, so a narrow pool is faster. When the media type cannot be
/// determined a middle value is used.
///
/// Querying the device is comparatively slow, so answers are cached per
/// drive for [`CACHE_TTL_HOURS`]. This is policy only: the walker is correct
/// with any worker count.
use crate::error::{CoreError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};
use tracing::{debug, warn};

pub const SOLID_STATE_WORKERS: usize = 16;
pub const ROTATIONAL_WORKERS: usize = 2;
pub const UNKNOWN_WORKERS: usize = 4;

/// How long a detected media type stays valid.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Storage media classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiskClass {
    SolidState,
    Rotational,
    Unknown,
}

impl DiskClass {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::SolidState => "SSD",
            Self::Rotational => "HDD",
            Self::Unknown => "Unknown",
        }
    }

    /// Walker pool size for this media type.
    pub fn worker_count(self) -> usize {
        match self {
            Self::SolidState => SOLID_STATE_WORKERS,
            Self::Rotational => ROTATIONAL_WORKERS,
            Self::Unknown => UNKNOWN_WORKERS,
        }
    }
}

/// Something that can tell what kind of device a path lives on.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<DiskClass>;
}

/// Probe backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl MediaProbe for SystemProbe {
    fn probe(&self, path: &Path) -> Result<DiskClass> {
        sys::probe(path)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedClass {
    class: DiskClass,
    detected_at: DateTime<Utc>,
}

/// Per-drive cache of detected media types.
pub struct DiskClassCache<P: MediaProbe = SystemProbe> {
    probe: P,
    ttl: TimeDelta,
    entries: Mutex<HashMap<String, CachedClass>>,
}

impl DiskClassCache<SystemProbe> {
    pub fn new() -> Self {
        Self::with_probe(SystemProbe, TimeDelta::hours(CACHE_TTL_HOURS))
    }
}

impl Default for DiskClassCache<SystemProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: MediaProbe> DiskClassCache<P> {
    pub fn with_probe(probe: P, ttl: TimeDelta) -> Self {
        Self {
            probe,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Pick a worker count for scanning `drive`.
    pub fn choose_worker_count(&self, drive: &Path) -> (usize, DiskClass) {
        let class = self.classify(drive);
        (class.worker_count(), class)
    }

    /// Media type of the device holding `drive`, from cache when fresh.
    pub fn classify(&self, drive: &Path) -> DiskClass {
        self.classify_at(drive, Utc::now())
    }

    fn classify_at(&self, drive: &Path, now: DateTime<Utc>) -> DiskClass {
        let key = drive_key(drive);
        if let Some(cached) = self.entries.lock().get(&key) {
            if now.signed_duration_since(cached.detected_at) < self.ttl {
                return cached.class;
            }
        }

        // Probe outside the lock; a concurrent duplicate probe is harmless.
        let class = match self.probe.probe(drive) {
            Ok(class) => class,
            Err(err) => {
                warn!("Could not determine media type: {err}");
                DiskClass::Unknown
            }
        };
        debug!("Drive {key} classified as {}", class.label());

        self.entries.lock().insert(
            key,
            CachedClass {
                class,
                detected_at: now,
            },
        );
        class
    }

    /// Forget every cached answer, forcing a re-probe on next use.
    pub fn invalidate(&self) {
        self.entries.lock().clear();
    }
}

/// Cache key: the drive prefix (`C:`) on Windows, the path elsewhere.
fn drive_key(path: &Path) -> String {
    match path.components().next() {
        Some(Component::Prefix(prefix)) => prefix.as_os_str().to_string_lossy().to_uppercase(),
        _ => path.to_string_lossy().into_owned(),
    }
}

#[cfg(windows)]
mod sys {
    use super::{probe_error, DiskClass};
    use crate::error::Result;
    use std::ffi::c_void;
    use std::path::Path;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
    };
    use windows::Win32::System::Ioctl::{
        PropertyStandardQuery, StorageDeviceSeekPenaltyProperty, DEVICE_SEEK_PENALTY_DESCRIPTOR,
        IOCTL_STORAGE_QUERY_PROPERTY, STORAGE_PROPERTY_QUERY,
    };
    use windows::Win32::System::IO::DeviceIoControl;

    /// Ask the volume whether it incurs a seek penalty.
    ///
    /// Opening `\\.\X:` with zero access rights is enough for this query and
    /// does not require elevation.
    pub fn probe(path: &Path) -> Result<DiskClass> {
        let fail = |message: String| probe_error(path, message);

        let text = path.to_string_lossy();
        let letter = text
            .chars()
            .next()
            .filter(|c| c.is_ascii_alphabetic() && text[1..].starts_with(':'))
            .ok_or_else(|| fail("not a drive-letter path".to_owned()))?;

        let device = format!("\\\\.\\{}:", letter.to_ascii_uppercase());
        let device_wide: Vec<u16> = device.encode_utf16().chain(std::iter::once(0)).collect();

        let handle = unsafe {
            CreateFileW(
                PCWSTR(device_wide.as_ptr()),
                0,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                None,
                OPEN_EXISTING,
                Default::default(),
                None,
            )
        }
        .map_err(|e| fail(format!("cannot open {device}: {e}")))?;

        let query = STORAGE_PROPERTY_QUERY {
            PropertyId: StorageDeviceSeekPenaltyProperty,
            QueryType: PropertyStandardQuery,
            ..Default::default()
        };
        let mut descriptor = DEVICE_SEEK_PENALTY_DESCRIPTOR::default();
        let mut bytes_returned: u32 = 0;

        let result = unsafe {
            DeviceIoControl(
                handle,
                IOCTL_STORAGE_QUERY_PROPERTY,
                Some(&query as *const STORAGE_PROPERTY_QUERY as *const c_void),
                std::mem::size_of::<STORAGE_PROPERTY_QUERY>() as u32,
                Some(&mut descriptor as *mut DEVICE_SEEK_PENALTY_DESCRIPTOR as *mut c_void),
                std::mem::size_of::<DEVICE_SEEK_PENALTY_DESCRIPTOR>() as u32,
                Some(&mut bytes_returned),
                None,
            )
        };
        unsafe {
            let _ = CloseHandle(handle);
        }
        result.map_err(|e| fail(format!("seek-penalty query failed: {e}")))?;

        Ok(if descriptor.IncursSeekPenalty.as_bool() {
            DiskClass::Rotational
        } else {
            DiskClass::SolidState
        })
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use super::DiskClass;
    use crate::error::Result;
    use std::fs;
    use std::os::unix::fs::MetadataExt;
    use std::path::{Path, PathBuf};

    /// Read the block layer's `rotational` flag for the device holding `path`.
    ///
    /// Partitions have no `queue/` directory of their own, so the parent
    /// (whole-disk) device is tried second. Virtual filesystems have no
    /// block device at all and come back as `Unknown`.
    pub fn probe(path: &Path) -> Result<DiskClass> {
        let dev = fs::metadata(path)?.dev();
        let (major, minor) = split_dev(dev);
        let base = PathBuf::from(format!("/sys/dev/block/{major}:{minor}"));

        for candidate in [
            base.join("queue/rotational"),
            base.join("../queue/rotational"),
        ] {
            if let Ok(text) = fs::read_to_string(&candidate) {
                return Ok(parse_rotational(&text));
            }
        }
        Ok(DiskClass::Unknown)
    }

    /// glibc `major()` / `minor()` encoding of a `dev_t`.
    pub(super) fn split_dev(dev: u64) -> (u64, u64) {
        let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & !0xfff);
        let minor = (dev & 0xff) | ((dev >> 12) & !0xff);
        (major, minor)
    }

    pub(super) fn parse_rotational(text: &str) -> DiskClass {
        match text.trim() {
            "0" => DiskClass::SolidState,
            "1" => DiskClass::Rotational,
            _ => DiskClass::Unknown,
        }
    }
}

#[cfg(not(any(windows, target_os = "linux")))]
mod sys {
    use super::DiskClass;
    use crate::error::Result;
    use std::path::Path;

    pub fn probe(_path: &Path) -> Result<DiskClass> {
        Ok(DiskClass::Unknown)
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
fn probe_error(path: &Path, message: impl Into<String>) -> CoreError {
    CoreError::MediaQuery {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
