/// Duplicate file detection (size first, then partial hash, then full hash).
///
/// Each stage is more expensive than the last and only sees the survivors of
/// the previous one, which keeps the number of bytes read close to the
/// number of bytes that are actually duplicated:
///
/// 1. Group by exact size. Unique sizes and zero-byte files are dropped
///    without opening anything.
/// 2. Hash the first [`PARTIAL_HASH_LEN`] bytes of each candidate (XxHash64)
///    and drop candidates whose prefix is unique within their size group.
/// 3. Hash the full content (BLAKE3, streamed in [`CHUNK_LEN`] chunks).
///    Only files agreeing on size and full hash form a [`DuplicateGroup`].
///
/// Candidates within a size group are hashed in parallel on the rayon pool.
/// Files that cannot be read at either hashing stage are dropped from their
/// group and the scan continues.
///
/// Progress is reported once per size group; the number of size groups is
/// known before any hashing starts, unlike the number of bytes to read.
use crate::model::{DuplicateGroup, FileRecord};
use crate::scanner::cancel::CancellationToken;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::hash::{Hash, Hasher as _};
use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;
use tracing::debug;
use twox_hash::XxHash64;

/// Bytes read from the start of each candidate for the partial hash.
pub const PARTIAL_HASH_LEN: u64 = 4096;

/// Read buffer size for the full-content hash.
pub const CHUNK_LEN: usize = 64 * 1024;

/// Outcome of a duplicate search.
#[derive(Debug, Default)]
pub struct DuplicateSearch {
    pub groups: Vec<DuplicateGroup>,
    /// Cancellation stopped the search before every size group was hashed.
    pub cancelled: bool,
}

/// Find all groups of files with identical content.
///
/// `on_progress(done, total)` is called after each size group. Groups are
/// returned largest file size first; ids run from 1 in that order.
pub fn find_duplicates<F>(
    files: Vec<FileRecord>,
    cancel: &CancellationToken,
    on_progress: F,
) -> Vec<DuplicateGroup>
where
    F: FnMut(usize, usize),
{
    find_duplicates_streaming(files, cancel, on_progress, |_| {}).groups
}

/// Like [`find_duplicates`], additionally handing each confirmed group to
/// `on_group` as soon as it is known.
///
/// On cancellation the groups confirmed so far are returned; a size group
/// interrupted mid-hash is discarded rather than reported incomplete.
pub fn find_duplicates_streaming<F, G>(
    files: Vec<FileRecord>,
    cancel: &CancellationToken,
    mut on_progress: F,
    mut on_group: G,
) -> DuplicateSearch
where
    F: FnMut(usize, usize),
    G: FnMut(&DuplicateGroup),
{
    let start = Instant::now();
    let candidates = files.len();
    let size_groups = group_by_size(files);
    let total = size_groups.len();
    debug!(
        "Duplicate search: {candidates} files, {total} size groups with more than one member"
    );

    let mut groups = Vec::new();
    let mut next_id = 1u64;
    let mut hashed_full = 0usize;
    let mut completed = 0usize;

    for (done, (size, members)) in size_groups.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let by_prefix = group_by_key(members, cancel, |rec| partial_hash(&rec.path));
        let mut confirmed = Vec::new();
        for survivors in by_prefix {
            hashed_full += survivors.len();
            confirmed.extend(group_by_key(survivors, cancel, |rec| full_hash(&rec.path)));
        }

        if cancel.is_cancelled() {
            break;
        }

        // Deterministic order within one size: by first member path.
        for members in &mut confirmed {
            members.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        }
        confirmed.sort_unstable_by(|a, b| a[0].path.cmp(&b[0].path));

        for members in confirmed {
            let group = DuplicateGroup {
                id: next_id,
                size,
                members,
            };
            next_id += 1;
            on_group(&group);
            groups.push(group);
        }

        completed = done + 1;
        on_progress(completed, total);
    }
    let cancelled = completed < total;

    debug!(
        "Duplicate search finished: {} groups, {} files fully hashed in {:?}{}",
        groups.len(),
        hashed_full,
        start.elapsed(),
        if cancelled { " (cancelled)" } else { "" }
    );
    DuplicateSearch { groups, cancelled }
}

/// Bucket files by size, keeping only buckets that could hold duplicates.
/// Largest size first.
fn group_by_size(files: Vec<FileRecord>) -> Vec<(u64, Vec<FileRecord>)> {
    let mut by_size: HashMap<u64, Vec<FileRecord>> = HashMap::new();
    for rec in files {
        if rec.size == 0 {
            continue;
        }
        by_size.entry(rec.size).or_default().push(rec);
    }

    let mut groups: Vec<(u64, Vec<FileRecord>)> = by_size
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .collect();
    groups.sort_unstable_by(|a, b| b.0.cmp(&a.0));
    groups
}

/// Hash every member in parallel and return the buckets with 2+ members.
///
/// Members whose hash fails are dropped; so is every member once the scan
/// is cancelled.
fn group_by_key<K, H>(
    members: Vec<FileRecord>,
    cancel: &CancellationToken,
    hash: H,
) -> Vec<Vec<FileRecord>>
where
    K: Eq + Hash + Send,
    H: Fn(&FileRecord) -> io::Result<K> + Sync,
{
    let keyed: Vec<(K, FileRecord)> = members
        .into_par_iter()
        .filter_map(|rec| {
            if cancel.is_cancelled() {
                return None;
            }
            match hash(&rec) {
                Ok(key) => Some((key, rec)),
                Err(err) => {
                    debug!("Dropping {} from duplicate search: {err}", rec.path.display());
                    None
                }
            }
        })
        .collect();

    let mut buckets: HashMap<K, Vec<FileRecord>> = HashMap::with_capacity(keyed.len());
    for (key, rec) in keyed {
        buckets.entry(key).or_default().push(rec);
    }
    buckets
        .into_values()
        .filter(|members| members.len() > 1)
        .collect()
}

/// XxHash64 of the first [`PARTIAL_HASH_LEN`] bytes.
pub fn partial_hash(path: &Path) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(PARTIAL_HASH_LEN as usize);
    file.take(PARTIAL_HASH_LEN).read_to_end(&mut prefix)?;

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&prefix);
    Ok(hasher.finish())
}

/// BLAKE3 digest of the whole file, read in fixed-size chunks.
pub fn full_hash(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK_LEN];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(*hasher.finalize().as_bytes())
}
