//! Marker-directory detection.
//!
//! A marker directory is linked at the target as one symlink instead of being
//! mirrored entry by entry.  A directory qualifies when it directly contains
//! an entry named after the marker, or when the caller designates it a
//! profile root.  The scan never descends into a directory it has already
//! classified, so nested markers are ignored.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::patterns::ExcludeSet;

/// Marker file that turns its directory into a single link unit.
pub const DEFAULT_DIRECTORY_MARKER: &str = ".symlink-as-directory";

/// Configurable marker scan.
///
/// Profile roots are given relative to the source root.
#[derive(Debug, Clone, Copy)]
pub struct MarkerDetector<'a> {
    marker_name: &'a str,
    profile_roots: &'a [PathBuf],
    excludes: Option<&'a ExcludeSet>,
}

impl<'a> MarkerDetector<'a> {
    /// Detect directories containing `marker_name`.
    #[must_use]
    pub const fn new(marker_name: &'a str) -> Self {
        Self {
            marker_name,
            profile_roots: &[],
            excludes: None,
        }
    }

    /// Treat these source-relative directories as markers unconditionally.
    #[must_use]
    pub const fn with_profile_roots(mut self, profile_roots: &'a [PathBuf]) -> Self {
        self.profile_roots = profile_roots;
        self
    }

    /// Do not search inside directories matched by `excludes`.
    #[must_use]
    pub const fn with_excludes(mut self, excludes: &'a ExcludeSet) -> Self {
        self.excludes = Some(excludes);
        self
    }

    fn is_marker(&self, dir: &Path, rel: &Path) -> bool {
        self.profile_roots.iter().any(|p| p == rel)
            || dir.join(self.marker_name).symlink_metadata().is_ok()
    }

    /// Scan `source_root` top-down and return every marker directory as an
    /// absolute path under it.
    ///
    /// The root itself is never a marker.  Directories that cannot be read
    /// are skipped; the synchronizer reports them when it visits them.
    #[must_use]
    pub fn scan(&self, source_root: &Path) -> BTreeSet<PathBuf> {
        let mut found = BTreeSet::new();
        let mut pending = vec![source_root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                // `file_type` does not follow symlinks: linked directories are leaves.
                if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                    continue;
                }
                let path = entry.path();
                let Ok(rel) = path.strip_prefix(source_root) else {
                    continue;
                };
                if self.excludes.is_some_and(|set| set.is_match(rel)) {
                    continue;
                }
                if self.is_marker(&path, rel) {
                    found.insert(path);
                } else {
                    pending.push(path);
                }
            }
        }

        found
    }
}

/// Find directories under `source_root` that directly contain `marker_name`.
///
/// Nested markers inside an already-found marker directory are not reported.
#[must_use]
pub fn find_marker_directories(source_root: &Path, marker_name: &str) -> BTreeSet<PathBuf> {
    MarkerDetector::new(marker_name).scan(source_root)
}

/// Return `true` if `path` is, or lies beneath, one of `marker_dirs`.
///
/// Comparison is component-wise: `config/nvim2` is not inside `config/nvim`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use std::path::{Path, PathBuf};
/// use symlink_dotfiles::markers::is_inside_marker_dir;
///
/// let markers = BTreeSet::from([PathBuf::from("/src/config/nvim")]);
/// assert!(is_inside_marker_dir(Path::new("/src/config/nvim/lua/init.lua"), &markers));
/// assert!(is_inside_marker_dir(Path::new("/src/config/nvim"), &markers));
/// assert!(!is_inside_marker_dir(Path::new("/src/config/nvim2"), &markers));
/// ```
#[must_use]
pub fn is_inside_marker_dir(path: &Path, marker_dirs: &BTreeSet<PathBuf>) -> bool {
    path.ancestors().any(|a| marker_dirs.contains(a))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn source_dir() -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("source");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("file1.txt"), "content1").unwrap();
        std::fs::create_dir(src.join("subdir")).unwrap();
        std::fs::write(src.join("subdir").join("file2.txt"), "content2").unwrap();
        (tmp, src)
    }

    fn mark(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(DEFAULT_DIRECTORY_MARKER), "").unwrap();
    }

    #[test]
    fn no_markers() {
        let (_tmp, src) = source_dir();
        assert!(find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER).is_empty());
    }

    #[test]
    fn single_marker() {
        let (_tmp, src) = source_dir();
        let marked = src.join("marked");
        mark(&marked);
        let markers = find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER);
        assert_eq!(markers, BTreeSet::from([marked]));
    }

    #[test]
    fn deeply_nested_marker() {
        let (_tmp, src) = source_dir();
        let marked = src.join("level1").join("level2").join("marked");
        mark(&marked);
        let markers = find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER);
        assert_eq!(markers, BTreeSet::from([marked]));
    }

    #[test]
    fn outer_marker_wins_over_inner() {
        let (_tmp, src) = source_dir();
        let outer = src.join("config").join("nvim");
        mark(&outer);
        mark(&outer.join("lua"));
        let markers = find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER);
        assert_eq!(markers, BTreeSet::from([outer]));
    }

    #[test]
    fn marker_in_root_does_not_mark_root() {
        let (_tmp, src) = source_dir();
        std::fs::write(src.join(DEFAULT_DIRECTORY_MARKER), "").unwrap();
        assert!(find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER).is_empty());
    }

    #[test]
    fn custom_marker_name() {
        let (_tmp, src) = source_dir();
        std::fs::write(src.join("subdir").join(".atomic"), "").unwrap();
        let markers = find_marker_directories(&src, ".atomic");
        assert_eq!(markers, BTreeSet::from([src.join("subdir")]));
        assert!(find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER).is_empty());
    }

    #[test]
    fn profile_roots_are_markers_without_sentinel() {
        let (_tmp, src) = source_dir();
        let roots = [PathBuf::from("subdir")];
        let markers = MarkerDetector::new(DEFAULT_DIRECTORY_MARKER)
            .with_profile_roots(&roots)
            .scan(&src);
        assert_eq!(markers, BTreeSet::from([src.join("subdir")]));
    }

    #[test]
    fn excluded_directories_are_not_searched() {
        let (_tmp, src) = source_dir();
        mark(&src.join(".git").join("hooks"));
        let excludes = ExcludeSet::new([".*"]).unwrap();
        let markers = MarkerDetector::new(DEFAULT_DIRECTORY_MARKER)
            .with_excludes(&excludes)
            .scan(&src);
        assert!(markers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let (tmp, src) = source_dir();
        let outside = tmp.path().join("outside");
        mark(&outside.join("inner"));
        std::os::unix::fs::symlink(&outside, src.join("linked")).unwrap();
        assert!(find_marker_directories(&src, DEFAULT_DIRECTORY_MARKER).is_empty());
    }

    #[test]
    fn not_inside() {
        let markers = BTreeSet::from([PathBuf::from("/t/a"), PathBuf::from("/t/b")]);
        assert!(!is_inside_marker_dir(Path::new("/t/c/file.txt"), &markers));
    }

    #[test]
    fn inside() {
        let markers = BTreeSet::from([PathBuf::from("/t/marker")]);
        assert!(is_inside_marker_dir(
            Path::new("/t/marker/subdir/file.txt"),
            &markers
        ));
    }
}
