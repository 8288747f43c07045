/// End-to-end scan tests.
///
/// These tests drive the real scan entry points (`run_scan` on the test
/// thread, `start_scan` on its background thread) against real temporary
/// directory trees: worker pool, queue, filter, hashing and empty-folder
/// passes all run exactly as they would on a user's drive.
use disktidy_core::analysis::{CleanTarget, TargetEstimate};
use disktidy_core::model::size::MB;
use disktidy_core::model::{DuplicateGroup, FileRecord};
use disktidy_core::scanner::cancel::CancellationToken;
use disktidy_core::scanner::progress::{ScanEvent, ScanMode, ScanStage, ScanSummary};
use disktidy_core::scanner::{
    run_scan, start_scan, ScanHandle, ScanRequest, PROGRESS_CHANNEL_CAPACITY,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Create a sparse file of `len` bytes without writing the data.
fn sized_file(path: &Path, len: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::File::create(path).unwrap().set_len(len).unwrap();
}

fn content_file(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

fn request(mode: ScanMode, root: &Path) -> ScanRequest {
    ScanRequest {
        worker_count: 4,
        ..ScanRequest::new(mode, vec![root.to_path_buf()])
    }
}

/// Everything a synchronous scan emitted, sorted into buckets.
#[derive(Default)]
struct Outcome {
    files: Vec<FileRecord>,
    groups: Vec<DuplicateGroup>,
    empty_dirs: Vec<PathBuf>,
    estimates: Vec<TargetEstimate>,
    terminal: Option<ScanEvent>,
    events_after_terminal: usize,
}

fn collect(outcome: &RefCell<Outcome>, event: ScanEvent) {
    let mut out = outcome.borrow_mut();
    if out.terminal.is_some() {
        out.events_after_terminal += 1;
        return;
    }
    match event {
        ScanEvent::FileFound(file) => out.files.push(file),
        ScanEvent::DuplicateGroupFound(group) => out.groups.push(group),
        ScanEvent::EmptyDirFound(path) => out.empty_dirs.push(path),
        ScanEvent::TargetEstimated(estimate) => out.estimates.push(estimate),
        ev @ (ScanEvent::Done(_) | ScanEvent::Cancelled(_)) => out.terminal = Some(ev),
        ScanEvent::Progress { .. } | ScanEvent::Stage { .. } => {}
    }
}

fn scan(request: &ScanRequest, cancel: &CancellationToken) -> (Outcome, ScanSummary) {
    scan_cancelling_at(request, cancel, |_| false)
}

/// Run a scan that cancels itself as soon as `stop_at` accepts an event.
/// The event is collected before the token is set.
fn scan_cancelling_at(
    request: &ScanRequest,
    cancel: &CancellationToken,
    stop_at: impl Fn(&ScanEvent) -> bool,
) -> (Outcome, ScanSummary) {
    let outcome = RefCell::new(Outcome::default());
    let summary = run_scan(request, cancel, |ev| {
        let stop = stop_at(&ev);
        collect(&outcome, ev);
        if stop {
            cancel.cancel();
        }
    });
    let outcome = outcome.into_inner();
    assert!(outcome.terminal.is_some(), "no terminal event was emitted");
    assert_eq!(outcome.events_after_terminal, 0);
    (outcome, summary)
}

fn scan_fresh(request: &ScanRequest) -> (Outcome, ScanSummary) {
    scan(request, &CancellationToken::new())
}

/// Drain a background scan, returning the terminal event.
///
/// Waits up to 30 seconds, more than enough for any tmpdir scan on any CI
/// machine but short enough that a stuck test does not block the suite.
fn drain_to_completion(handle: &ScanHandle) -> ScanEvent {
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    loop {
        assert!(
            std::time::Instant::now() < deadline,
            "scanner did not complete within 30 seconds"
        );
        match handle.events.recv_timeout(Duration::from_millis(100)) {
            Ok(ev) if ev.is_terminal() => return ev,
            Ok(_) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                panic!("scanner channel disconnected before a terminal event was sent");
            }
        }
    }
}

fn relative(root: &Path, paths: impl IntoIterator<Item = PathBuf>) -> HashSet<PathBuf> {
    paths
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn big_files_above_threshold_largest_first() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    sized_file(&root.join("a.txt"), 10 * MB);
    sized_file(&root.join("b.txt"), 10 * MB);
    sized_file(&root.join("c.txt"), MB);

    let req = ScanRequest {
        min_size: 5 * MB,
        ..request(ScanMode::BigFiles, root)
    };
    let (out, summary) = scan_fresh(&req);

    let names: Vec<String> = out.files.iter().map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(summary.visited_files, 3);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.reclaimable_bytes, 20 * MB);
    assert!(matches!(out.terminal, Some(ScanEvent::Done(_))));
}

#[test]
fn big_file_cap_limits_reported_not_matched() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    for i in 1..=5u64 {
        sized_file(&tmp.path().join(format!("d{i}/f.bin")), i * 1_000);
    }

    let req = ScanRequest {
        result_cap: Some(2),
        ..request(ScanMode::BigFiles, tmp.path())
    };
    let (out, summary) = scan_fresh(&req);

    let sizes: Vec<u64> = out.files.iter().map(|f| f.size).collect();
    assert_eq!(sizes, vec![5_000, 4_000]);
    assert_eq!(summary.matched, 5);
    assert_eq!(summary.reported, 2);
}

#[test]
fn repeated_big_file_scan_is_identical() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    for d in 0..6 {
        for f in 0..8u64 {
            let path = tmp.path().join(format!("dir{d}/sub/f{f}.dat"));
            sized_file(&path, (f % 3) * 512 + 1);
        }
    }
    let req = request(ScanMode::BigFiles, tmp.path());

    let (first, _) = scan_fresh(&req);
    let (second, _) = scan_fresh(&req);
    assert_eq!(first.files.len(), 48);
    assert_eq!(first.files, second.files);
}

#[test]
fn duplicates_group_identical_content_only() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    content_file(&root.join("x.bin"), b"the same twenty bytes");
    content_file(&root.join("nested/y.bin"), b"the same twenty bytes");
    content_file(&root.join("z.bin"), b"the same twenty bytez");

    let (out, summary) = scan_fresh(&request(ScanMode::Duplicates, root));

    assert_eq!(out.groups.len(), 1);
    let members = relative(root, out.groups[0].members.iter().map(|m| m.path.clone()));
    let expected: HashSet<PathBuf> =
        [PathBuf::from("x.bin"), PathBuf::from("nested/y.bin")].into();
    assert_eq!(members, expected);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.reclaimable_bytes, 21);
}

#[test]
fn nested_roots_do_not_duplicate_themselves() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    content_file(&tmp.path().join("inner/only.txt"), b"one copy");

    let req = ScanRequest::new(
        ScanMode::Duplicates,
        vec![tmp.path().to_path_buf(), tmp.path().join("inner")],
    );
    let (out, summary) = scan_fresh(&req);
    assert!(out.groups.is_empty());
    assert_eq!(summary.visited_files, 1);
}

#[test]
fn empty_dirs_found_bottom_up() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    fs::create_dir_all(root.join("empty1")).unwrap();
    fs::create_dir_all(root.join("empty2/empty3")).unwrap();
    content_file(&root.join("full/f.txt"), b"keep");

    let (out, _) = scan_fresh(&request(ScanMode::EmptyDirs, root));

    let found = relative(root, out.empty_dirs.clone());
    let expected: HashSet<PathBuf> = ["empty1", "empty2", "empty2/empty3"]
        .iter()
        .map(PathBuf::from)
        .collect();
    assert_eq!(found, expected);

    let pos = |name: &str| out.empty_dirs.iter().position(|p| p.ends_with(name)).unwrap();
    assert!(pos("empty3") < pos("empty2"));
}

#[test]
fn reported_empty_dir_implies_its_subtree_reported() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    for rel in ["a/b/c", "a/b/d", "a/e", "f/g", "h"] {
        fs::create_dir_all(root.join(rel)).unwrap();
    }
    content_file(&root.join("f/g/file"), b"x");

    let (out, _) = scan_fresh(&request(ScanMode::EmptyDirs, root));
    let found: HashSet<PathBuf> = out.empty_dirs.iter().cloned().collect();

    for dir in &found {
        for entry in fs::read_dir(dir).unwrap() {
            let child = entry.unwrap().path();
            assert!(
                found.contains(&child),
                "{} reported empty but child {} was not",
                dir.display(),
                child.display()
            );
        }
    }
    assert!(found.contains(&root.join("a")));
    assert!(!found.contains(&root.join("f")));
}

#[test]
fn excluded_subtrees_never_appear_in_any_mode() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    content_file(&root.join("keep/dup1"), b"duplicate payload");
    content_file(&root.join("skip/dup2"), b"duplicate payload");
    content_file(&root.join("skip/deeper/dup3"), b"duplicate payload");
    fs::create_dir_all(root.join("skip/hollow")).unwrap();
    fs::create_dir_all(root.join("keep/hollow")).unwrap();
    let excluded = root.join("skip");

    for mode in [ScanMode::BigFiles, ScanMode::Duplicates, ScanMode::EmptyDirs] {
        let req = ScanRequest {
            exclusions: vec![excluded.clone()],
            ..request(mode, root)
        };
        let (out, summary) = scan_fresh(&req);

        let mut paths: Vec<PathBuf> = out.files.iter().map(|f| f.path.clone()).collect();
        paths.extend(out.groups.iter().flat_map(|g| g.members.iter().map(|m| m.path.clone())));
        paths.extend(out.empty_dirs.iter().cloned());
        assert!(
            paths.iter().all(|p| !p.starts_with(&excluded)),
            "{mode:?} reported an excluded path: {paths:?}"
        );
        assert_eq!(summary.visited_files, 1, "{mode:?}");
    }
}

#[test]
fn visited_count_ignores_skipped_extensions() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    sized_file(&root.join("driver.sys"), 4 * MB);
    sized_file(&root.join("DRIVER2.SYS"), 4 * MB);
    sized_file(&root.join("a/data.bin"), 4 * MB);
    sized_file(&root.join("a/b/small.txt"), 10);

    let req = ScanRequest {
        skip_extensions: vec!["sys".to_owned()],
        min_size: MB,
        ..request(ScanMode::BigFiles, root)
    };
    let (out, summary) = scan_fresh(&req);

    assert_eq!(out.files.len(), 1);
    assert_eq!(out.files[0].file_name(), "data.bin");
    assert_eq!(summary.visited_files, 2);
}

#[test]
fn missing_root_yields_empty_result() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let req = request(ScanMode::BigFiles, &tmp.path().join("not-there"));
    let (out, summary) = scan_fresh(&req);
    assert!(out.files.is_empty());
    assert_eq!(summary.visited_files, 0);
    assert!(matches!(out.terminal, Some(ScanEvent::Done(_))));
}

#[test]
fn cancelled_scan_reports_a_subset() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    for i in 0..20 {
        content_file(&root.join(format!("d{i}/copy.bin")), b"identical");
        fs::create_dir_all(root.join(format!("e{i}/inner"))).unwrap();
    }

    for mode in [ScanMode::BigFiles, ScanMode::Duplicates, ScanMode::EmptyDirs] {
        let req = request(mode, root);
        let (full, _) = scan_fresh(&req);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (partial, summary) = scan(&req, &cancel);

        assert!(summary.cancelled);
        assert!(matches!(partial.terminal, Some(ScanEvent::Cancelled(_))));
        let full_files: HashSet<_> = full.files.iter().collect();
        assert!(partial.files.iter().all(|f| full_files.contains(f)));
        let full_dirs: HashSet<_> = full.empty_dirs.iter().collect();
        assert!(partial.empty_dirs.iter().all(|d| full_dirs.contains(d)));
        assert!(partial.groups.len() <= full.groups.len());
    }
}

/// Three pairs of identical files, each pair a different size.
fn three_duplicate_pairs(root: &Path) {
    for (i, len) in [300usize, 200, 100].into_iter().enumerate() {
        let data = vec![b'a' + i as u8; len];
        content_file(&root.join(format!("one/copy{i}.bin")), &data);
        content_file(&root.join(format!("two/copy{i}.bin")), &data);
    }
}

#[test]
fn duplicates_cancelled_after_first_size_group_keep_that_group() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    three_duplicate_pairs(root);
    let req = request(ScanMode::Duplicates, root);
    let (full, _) = scan_fresh(&req);
    assert_eq!(full.groups.len(), 3);

    let cancel = CancellationToken::new();
    let (partial, summary) = scan_cancelling_at(&req, &cancel, |ev| {
        matches!(
            ev,
            ScanEvent::Stage {
                stage: ScanStage::Hashing,
                done: 1,
                ..
            }
        )
    });

    assert!(summary.cancelled);
    assert!(matches!(partial.terminal, Some(ScanEvent::Cancelled(_))));
    assert_eq!(partial.groups.len(), 1);
    assert_eq!(partial.groups[0].size, 300);
    assert!(partial.groups.iter().all(|g| full.groups.contains(g)));
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.reclaimable_bytes, 300);
}

#[test]
fn empty_dirs_cancelled_at_first_find_report_a_subset() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    for i in 0..20 {
        fs::create_dir_all(root.join(format!("e{i}/inner"))).unwrap();
    }
    let req = request(ScanMode::EmptyDirs, root);
    let (full, _) = scan_fresh(&req);

    let cancel = CancellationToken::new();
    let (partial, summary) =
        scan_cancelling_at(&req, &cancel, |ev| matches!(ev, ScanEvent::EmptyDirFound(_)));

    assert!(summary.cancelled);
    assert!(matches!(partial.terminal, Some(ScanEvent::Cancelled(_))));
    assert_eq!(partial.empty_dirs.len(), 1);
    assert!(partial.empty_dirs[0].ends_with("inner"));
    let full_dirs: HashSet<_> = full.empty_dirs.iter().collect();
    assert!(partial.empty_dirs.iter().all(|d| full_dirs.contains(d)));
    assert!(partial.empty_dirs.len() < full.empty_dirs.len());
}

#[test]
fn cancel_after_the_last_result_still_completes() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    content_file(&root.join("a/same.bin"), b"twice");
    content_file(&root.join("b/same.bin"), b"twice");
    sized_file(&root.join("big.iso"), 2 * MB);

    let dup = request(ScanMode::Duplicates, root);
    let cancel = CancellationToken::new();
    let (out, summary) =
        scan_cancelling_at(&dup, &cancel, |ev| matches!(ev, ScanEvent::DuplicateGroupFound(_)));
    assert!(!summary.cancelled);
    assert!(matches!(out.terminal, Some(ScanEvent::Done(_))));
    assert_eq!(out.groups.len(), 1);

    // Big files are emitted only after the walk, so every one is late.
    let big = ScanRequest {
        min_size: MB,
        ..request(ScanMode::BigFiles, root)
    };
    let cancel = CancellationToken::new();
    let (out, summary) =
        scan_cancelling_at(&big, &cancel, |ev| matches!(ev, ScanEvent::FileFound(_)));
    assert!(!summary.cancelled);
    assert!(matches!(out.terminal, Some(ScanEvent::Done(_))));
    assert_eq!(out.files.len(), 1);
}

#[test]
fn clean_estimate_sizes_selected_targets() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let root = tmp.path();
    sized_file(&root.join("temp/a.tmp"), 1000);
    sized_file(&root.join("temp/sub/b.tmp"), 500);
    sized_file(&root.join("Explorer/thumbcache_96.db"), 64);
    sized_file(&root.join("Explorer/notes.txt"), 9999);
    sized_file(&root.join("cache/ignored.bin"), 7777);

    let req = ScanRequest {
        clean_targets: vec![
            CleanTarget::directory("temp", root.join("temp"), true, ""),
            CleanTarget::glob("thumbs", root.join("Explorer"), "thumbcache*.db", true, ""),
            CleanTarget::directory("cache", root.join("cache"), false, ""),
            CleanTarget::file("dump", root.join("MEMORY.DMP"), true, ""),
        ],
        ..request(ScanMode::CleanEstimate, root)
    };
    let (out, summary) = scan_fresh(&req);

    assert!(matches!(out.terminal, Some(ScanEvent::Done(_))));
    let names: Vec<_> = out.estimates.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["temp", "thumbs", "dump"]);
    assert_eq!(out.estimates[0].bytes, 1500);
    assert_eq!(out.estimates[1].bytes, 64);
    assert!(!out.estimates[2].exists);
    assert_eq!(summary.matched, 3);
    assert_eq!(summary.visited_files, 3);
    assert_eq!(summary.reclaimable_bytes, 1564);
}

#[test]
fn background_scan_streams_to_done() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    for i in 0..50 {
        sized_file(&tmp.path().join(format!("file{i:03}.bin")), 1024);
    }

    let handle = start_scan(request(ScanMode::BigFiles, tmp.path()));
    let mut found = 0;
    let terminal = loop {
        match handle.events.recv_timeout(Duration::from_secs(30)) {
            Ok(ScanEvent::FileFound(_)) => found += 1,
            Ok(ev) if ev.is_terminal() => break ev,
            Ok(_) => continue,
            Err(err) => panic!("scanner stopped without a terminal event: {err}"),
        }
    };

    match terminal {
        ScanEvent::Done(summary) => {
            assert_eq!(summary.visited_files, 50);
            assert_eq!(summary.reported, found);
        }
        other => panic!("expected Done, got {other:?}"),
    }
    let summary = handle.join().expect("scanner thread panicked");
    assert!(!summary.cancelled);
}

#[test]
fn background_scan_honours_cancel() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    for i in 0..10 {
        fs::create_dir_all(tmp.path().join(format!("a{i}/b/c"))).unwrap();
    }

    let handle = start_scan(request(ScanMode::EmptyDirs, tmp.path()));
    // The scan may already be done by the time the flag is read, so either
    // terminal event is acceptable.
    handle.cancel();
    assert!(handle.is_cancelled());

    let terminal = drain_to_completion(&handle);
    assert!(terminal.is_terminal());
    assert!(handle.join().is_some());
}

/// A zero-capacity channel would make every `send()` rendezvous with the
/// host and stall the scan.
const _: () = assert!(
    PROGRESS_CHANNEL_CAPACITY > 0,
    "PROGRESS_CHANNEL_CAPACITY must be > 0"
);
