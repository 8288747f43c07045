/// Path filtering for the walker.
///
/// Two predicates are applied while listing a directory:
///
/// - **Exclusion prefixes** prune whole subtrees. A directory equal to or
///   below an excluded path is never enqueued, so nothing beneath it is
///   ever listed. Matching is by path component, so excluding
///   `C:\Program Files` does not exclude `C:\Program Files Extra`.
/// - **Skip extensions** drop individual files (e.g. `.sys` driver and
///   pagefile images that can never be cleaned up).
///
/// Extensions always compare case-insensitively. Prefixes do so only on
/// Windows, matching NTFS.
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    /// Excluded prefixes, already in comparable form.
    exclusions: Vec<PathBuf>,
    /// Lowercased extensions without the leading dot.
    skip_extensions: Vec<String>,
}

impl PathFilter {
    pub fn new<P, S>(exclusions: &[P], skip_extensions: &[S]) -> Self
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        Self {
            exclusions: exclusions
                .iter()
                .map(|p| comparable(p.as_ref()).into_owned())
                .collect(),
            skip_extensions: skip_extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// `true` if `path` is one of the excluded prefixes or lies beneath one.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.exclusions.is_empty() {
            return false;
        }
        let path = comparable(path);
        self.exclusions.iter().any(|ex| path.starts_with(ex))
    }

    /// `true` if a file with this name should be ignored by extension.
    pub fn skips_extension(&self, file_name: &OsStr) -> bool {
        if self.skip_extensions.is_empty() {
            return false;
        }
        match Path::new(file_name).extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy();
                self.skip_extensions
                    .iter()
                    .any(|skip| skip.eq_ignore_ascii_case(&ext))
            }
            None => false,
        }
    }

    /// Reduce a root list to the set that should actually be walked.
    ///
    /// Drops excluded roots, exact duplicates, and roots nested inside
    /// another root (walking both would report every nested file twice,
    /// which would make each one look like its own duplicate).
    pub fn normalize_roots(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let mut candidates: Vec<(&PathBuf, PathBuf)> = roots
            .iter()
            .filter(|r| !self.is_excluded(r))
            .map(|r| (r, comparable(r).into_owned()))
            .collect();
        // Shallowest first so an ancestor is always kept before its descendants.
        candidates.sort_by_key(|(_, cmp)| cmp.components().count());

        let mut kept: Vec<(&PathBuf, PathBuf)> = Vec::with_capacity(candidates.len());
        for (original, cmp) in candidates {
            if kept.iter().any(|(_, k)| cmp.starts_with(k)) {
                continue;
            }
            kept.push((original, cmp));
        }
        kept.into_iter().map(|(original, _)| original.clone()).collect()
    }
}

/// Case-fold a path on Windows; borrow it unchanged elsewhere.
fn comparable(path: &Path) -> Cow<'_, Path> {
    if cfg!(windows) {
        Cow::Owned(PathBuf::from(
            path.to_string_lossy().replace('/', "\\").to_lowercase(),
        ))
    } else {
        Cow::Borrowed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn excludes_prefix_and_descendants() {
        let filter = PathFilter::new(&[p("/data/cache")], &[] as &[&str]);
        assert!(filter.is_excluded(&p("/data/cache")));
        assert!(filter.is_excluded(&p("/data/cache/a/b")));
        assert!(!filter.is_excluded(&p("/data")));
        assert!(!filter.is_excluded(&p("/data/other")));
    }

    #[test]
    fn exclusion_matches_whole_components() {
        let filter = PathFilter::new(&[p("/opt/app")], &[] as &[&str]);
        assert!(!filter.is_excluded(&p("/opt/application")));
    }

    #[test]
    fn empty_filter_excludes_nothing() {
        let filter = PathFilter::default();
        assert!(!filter.is_excluded(&p("/anything")));
        assert!(!filter.skips_extension(OsStr::new("x.sys")));
    }

    #[test]
    fn skip_extension_is_case_insensitive() {
        let filter = PathFilter::new(&[] as &[PathBuf], &[".sys", "TMP"]);
        assert!(filter.skips_extension(OsStr::new("pagefile.sys")));
        assert!(filter.skips_extension(OsStr::new("DRIVER.SYS")));
        assert!(filter.skips_extension(OsStr::new("a.tmp")));
        assert!(!filter.skips_extension(OsStr::new("system")));
        assert!(!filter.skips_extension(OsStr::new("notes.txt")));
    }

    #[test]
    fn normalize_roots_drops_nested_duplicate_and_excluded() {
        let filter = PathFilter::new(&[p("/skip")], &[] as &[&str]);
        let roots = vec![
            p("/data/photos"),
            p("/data"),
            p("/data"),
            p("/skip/inner"),
            p("/home"),
        ];
        let mut kept = filter.normalize_roots(&roots);
        kept.sort();
        assert_eq!(kept, vec![p("/data"), p("/home")]);
    }
}
