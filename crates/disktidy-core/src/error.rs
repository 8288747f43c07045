/// Error types for the ambient layers of the engine.
///
/// The scanning engine itself has no fatal error class: per-entry I/O
/// failures are swallowed and a scan always produces a (possibly partial)
/// result. The variants below cover configuration loading, report export,
/// and the storage-media probe.
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for `disktidy-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A size string such as `"500 MB"` could not be parsed.
    #[error("invalid size '{0}': expected a number with an optional B/KB/MB/GB/TB unit")]
    InvalidSize(String),

    /// Writing a CSV report failed.
    #[error("report export failed: {0}")]
    Export(#[from] csv::Error),

    /// The storage device backing a path could not be queried.
    #[error("media query failed for {path}: {message}")]
    MediaQuery { path: PathBuf, message: String },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
