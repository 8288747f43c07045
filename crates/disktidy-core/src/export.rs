/// CSV reports of scan results.
///
/// Each writer takes any `io::Write`, so the host can target a file while
/// tests target a `Vec<u8>`. Sizes are written both as raw bytes (for
/// sorting in a spreadsheet) and in human form.
use crate::analysis::clean_targets::TargetEstimate;
use crate::error::Result;
use crate::model::size::format_size;
use crate::model::{DuplicateGroup, FileRecord};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct BigFileRow<'a> {
    size_bytes: u64,
    size: String,
    name: String,
    path: &'a Path,
}

#[derive(Serialize)]
struct DuplicateRow<'a> {
    group: u64,
    size_bytes: u64,
    size: String,
    path: &'a Path,
}

#[derive(Serialize)]
struct EmptyDirRow<'a> {
    path: &'a Path,
}

#[derive(Serialize)]
struct CleanEstimateRow<'a> {
    target: &'a str,
    exists: bool,
    files: u64,
    size_bytes: u64,
    size: String,
    path: &'a Path,
}

/// One row per file, in the order given.
pub fn write_big_files_csv<W: Write>(writer: W, files: &[FileRecord]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for file in files {
        out.serialize(BigFileRow {
            size_bytes: file.size,
            size: format_size(file.size),
            name: file.file_name(),
            path: &file.path,
        })?;
    }
    out.flush()?;
    Ok(())
}

/// One row per group member, tagged with its group id.
pub fn write_duplicates_csv<W: Write>(writer: W, groups: &[DuplicateGroup]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for group in groups {
        for member in &group.members {
            out.serialize(DuplicateRow {
                group: group.id,
                size_bytes: group.size,
                size: format_size(group.size),
                path: &member.path,
            })?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn write_empty_dirs_csv<W: Write>(writer: W, dirs: &[PathBuf]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for dir in dirs {
        out.serialize(EmptyDirRow { path: dir })?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_clean_estimates_csv<W: Write>(writer: W, estimates: &[TargetEstimate]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for estimate in estimates {
        out.serialize(CleanEstimateRow {
            target: &estimate.name,
            exists: estimate.exists,
            files: estimate.files,
            size_bytes: estimate.bytes,
            size: format_size(estimate.bytes),
            path: &estimate.path,
        })?;
    }
    out.flush()?;
    Ok(())
}
