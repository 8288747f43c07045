/// DiskTidy Core: scanning engine, cleanup analyses, and data model.
///
/// This crate contains all business logic with zero UI dependencies. A host
/// (the `disktidy` binary, or a GUI) builds a [`scanner::ScanRequest`],
/// calls [`scanner::start_scan`], and drains [`scanner::progress::ScanEvent`]s
/// from the returned handle.
///
/// # Modules
///
/// - [`scanner`]: parallel directory walk, work queue, cancellation, scan driver.
/// - [`analysis`]: duplicate-content and empty-directory passes.
/// - [`model`]: file records, duplicate groups, size formatting.
/// - [`platform`]: storage-media detection for sizing the walker pool.
/// - [`config`]: JSON scan configuration with defaults.
/// - [`export`]: CSV reports.
pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod platform;
pub mod scanner;

pub use error::{CoreError, Result};
