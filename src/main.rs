//! DiskTidy: disk cleanup scanner.
//!
//! Thin binary entry point. All logic lives in the `disktidy-core` crate.
//!
//! Usage: `disktidy [config.json]`. Without a file the built-in defaults
//! are used (big-file scan of the system drive). The `clean_estimate` mode
//! only measures junk targets; nothing is ever deleted.

use anyhow::Context;
use disktidy_core::analysis::TargetEstimate;
use disktidy_core::config::ScanConfig;
use disktidy_core::export;
use disktidy_core::model::size::{format_count, format_size};
use disktidy_core::model::{DuplicateGroup, FileRecord};
use disktidy_core::scanner::progress::{ScanEvent, ScanMode, ScanStage};
use disktidy_core::scanner::start_scan;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Results gathered from the event stream for the final report.
#[derive(Default)]
struct Collected {
    files: Vec<FileRecord>,
    groups: Vec<DuplicateGroup>,
    empty_dirs: Vec<PathBuf>,
    estimates: Vec<TargetEstimate>,
}

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("DiskTidy starting");

    let config = match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            ScanConfig::load(&path)
                .with_context(|| format!("loading configuration {}", path.display()))?
        }
        None => ScanConfig::default(),
    };

    let request = config
        .to_request(config.mode)
        .context("building scan request")?;
    let mode = request.mode;
    let handle = start_scan(request);

    let mut collected = Collected::default();
    for event in handle.events.iter() {
        match event {
            ScanEvent::Progress { visited } => {
                tracing::info!("{} files scanned", format_count(visited));
            }
            ScanEvent::Stage { stage, done, total } => {
                let what = match stage {
                    ScanStage::Hashing => "size groups hashed",
                    ScanStage::CheckingDirectories => "folders checked",
                    ScanStage::Estimating => "targets measured",
                };
                tracing::info!("{done}/{total} {what}");
            }
            ScanEvent::FileFound(file) => {
                println!("{:>10}  {}", format_size(file.size), file.path.display());
                collected.files.push(file);
            }
            ScanEvent::DuplicateGroupFound(group) => {
                println!(
                    "group {} ({} x {}, {} reclaimable)",
                    group.id,
                    group.members.len(),
                    format_size(group.size),
                    format_size(group.reclaimable_bytes())
                );
                for member in &group.members {
                    println!("    {}", member.path.display());
                }
                collected.groups.push(group);
            }
            ScanEvent::EmptyDirFound(path) => {
                println!("{}", path.display());
                collected.empty_dirs.push(path);
            }
            ScanEvent::TargetEstimated(estimate) => {
                if estimate.exists {
                    println!(
                        "{:>10}  {} ({} files)",
                        format_size(estimate.bytes),
                        estimate.name,
                        format_count(estimate.files)
                    );
                } else {
                    println!("{:>10}  {} (not present)", "-", estimate.name);
                }
                collected.estimates.push(estimate);
            }
            ScanEvent::Done(summary) | ScanEvent::Cancelled(summary) => {
                tracing::info!(
                    "{}: {} matched, {} reported, {} reclaimable, {} files visited in {:.1}s{}",
                    mode.label(),
                    summary.matched,
                    summary.reported,
                    format_size(summary.reclaimable_bytes),
                    format_count(summary.visited_files),
                    summary.duration.as_secs_f64(),
                    if summary.cancelled { " (cancelled)" } else { "" }
                );
                break;
            }
        }
    }

    if handle.join().is_none() {
        anyhow::bail!("scanner thread panicked");
    }

    if let Some(path) = &config.report_csv {
        write_report(path, mode, &collected)
            .with_context(|| format!("writing report {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(())
}

fn write_report(path: &Path, mode: ScanMode, collected: &Collected) -> anyhow::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    match mode {
        ScanMode::BigFiles => export::write_big_files_csv(writer, &collected.files)?,
        ScanMode::Duplicates => export::write_duplicates_csv(writer, &collected.groups)?,
        ScanMode::EmptyDirs => export::write_empty_dirs_csv(writer, &collected.empty_dirs)?,
        ScanMode::CleanEstimate => {
            export::write_clean_estimates_csv(writer, &collected.estimates)?
        }
    }
    Ok(())
}
