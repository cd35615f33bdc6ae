//! Per-entry classification and the sequential walk.
use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs::FileType;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SyncError;
use crate::patterns::ExcludeSet;
use crate::resources::directory::DirectoryResource;
use crate::resources::symlink::link_with;
use crate::resources::{ApplyOpts, apply};
use crate::result::{Outcome, SymlinkResult, SyncReport};

use super::SyncOptions;

/// A source entry discovered while reading its parent.
#[derive(Debug)]
pub(super) struct Entry {
    pub(super) path: PathBuf,
    pub(super) file_type: FileType,
}

/// What the walk does with one entry.
#[derive(Debug)]
pub(super) enum Step {
    /// Record this result; nothing below the entry is visited.
    Done(SymlinkResult),
    /// The target directory is in place; visit these children.
    Descend(Vec<Entry>),
    /// The entry was not visited because the run was cancelled.
    Cancelled,
}

/// Read-only state shared by every step of one run.
#[derive(Debug)]
pub(super) struct Walker<'a> {
    source_root: PathBuf,
    target_root: PathBuf,
    excludes: ExcludeSet,
    markers: BTreeSet<PathBuf>,
    opts: &'a SyncOptions,
    interrupted: AtomicBool,
}

impl<'a> Walker<'a> {
    pub(super) const fn new(
        source_root: PathBuf,
        target_root: PathBuf,
        excludes: ExcludeSet,
        markers: BTreeSet<PathBuf>,
        opts: &'a SyncOptions,
    ) -> Self {
        Self {
            source_root,
            target_root,
            excludes,
            markers,
            opts,
            interrupted: AtomicBool::new(false),
        }
    }

    pub(super) fn source_root(&self) -> &Path {
        &self.source_root
    }

    const fn apply_opts(&self) -> ApplyOpts {
        ApplyOpts {
            force: self.opts.force,
            dry_run: self.opts.dry_run,
        }
    }

    fn is_cancelled(&self) -> bool {
        let cancelled = self
            .opts
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        if cancelled {
            self.interrupted.store(true, Ordering::Relaxed);
        }
        cancelled
    }

    /// Map a source path to its target, prefixing the first relative component.
    pub(super) fn target_for(&self, source: &Path) -> PathBuf {
        let Ok(rel) = source.strip_prefix(&self.source_root) else {
            return self.target_root.clone();
        };
        let mut components = rel.components();
        let Some(first) = components.next() else {
            return self.target_root.clone();
        };
        let mut name = OsString::from(&self.opts.prefix);
        name.push(first.as_os_str());
        let target = self.target_root.join(name);
        let rest = components.as_path();
        // Joining an empty path would append a trailing separator.
        if rest.as_os_str().is_empty() {
            target
        } else {
            target.join(rest)
        }
    }

    /// Children of the source root.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Traversal`] if the root cannot be read.
    pub(super) fn root_entries(&self) -> Result<Vec<Entry>, SyncError> {
        read_entries(&self.source_root).map_err(|source| SyncError::Traversal {
            path: self.source_root.clone(),
            source,
        })
    }

    /// Why `entry` is excluded, if it is.
    fn exclusion(&self, entry: &Entry, rel: &Path) -> Option<String> {
        let name = entry.path.file_name()?;
        if rel.components().count() == 1
            && self
                .opts
                .exclude_dirs
                .iter()
                .any(|d| OsStr::new(d) == name)
        {
            return Some("excluded directory".to_string());
        }
        if let Some(pattern) = self.excludes.first_match(rel) {
            return Some(format!("matches '{pattern}'"));
        }
        // Marker files never reach here from inside a marker directory.
        if name == OsStr::new(&self.opts.marker_name) {
            return Some("marker file".to_string());
        }
        None
    }

    /// Decide one entry.
    pub(super) fn step(&self, entry: Entry) -> Step {
        if self.is_cancelled() {
            return Step::Cancelled;
        }
        let target = self.target_for(&entry.path);
        let rel = entry
            .path
            .strip_prefix(&self.source_root)
            .unwrap_or(&entry.path);

        if let Some(reason) = self.exclusion(&entry, rel) {
            tracing::debug!("excluded {} ({reason})", rel.display());
            return Step::Done(
                SymlinkResult::new(&entry.path, target, Outcome::Excluded).with_detail(reason),
            );
        }

        if entry.file_type.is_dir() && !self.markers.contains(&entry.path) {
            return self.directory(entry.path, target);
        }

        Step::Done(link_with(&entry.path, &target, self.apply_opts()))
    }

    fn directory(&self, source: PathBuf, target: PathBuf) -> Step {
        let result = apply(
            &DirectoryResource::new(source.clone(), target),
            self.apply_opts(),
        );
        if !matches!(result.outcome, Outcome::Created | Outcome::AlreadyCorrect) {
            return Step::Done(result);
        }
        match read_entries(&source) {
            Ok(children) => Step::Descend(children),
            Err(e) => Step::Done(SymlinkResult::conflict(
                &source,
                &result.target,
                format!("cannot read source directory: {e}"),
            )),
        }
    }

    /// Assemble the final report from unordered results.
    pub(super) fn finish(&self, mut results: Vec<SymlinkResult>) -> SyncReport {
        results.sort_by(|a, b| a.source.cmp(&b.source));
        SyncReport {
            results,
            cancelled: self.interrupted.load(Ordering::Relaxed),
            dry_run: self.opts.dry_run,
        }
    }

    /// Depth-first, lexicographic walk with an explicit stack.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Traversal`] if the source root cannot be read.
    pub(super) fn walk(&self) -> Result<SyncReport, SyncError> {
        let mut stack = self.root_entries()?;
        stack.reverse();
        let mut results = Vec::new();

        while let Some(entry) = stack.pop() {
            match self.step(entry) {
                Step::Done(result) => results.push(result),
                Step::Descend(children) => stack.extend(children.into_iter().rev()),
                Step::Cancelled => break,
            }
        }

        Ok(self.finish(results))
    }
}

/// List a directory's entries sorted by name, without following symlinks.
pub(super) fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| {
            let entry = entry?;
            Ok(Entry {
                file_type: entry.file_type()?,
                path: entry.path(),
            })
        })
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(entries)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn walker<'a>(opts: &'a SyncOptions) -> Walker<'a> {
        Walker::new(
            PathBuf::from("/src"),
            PathBuf::from("/home/user"),
            ExcludeSet::default(),
            BTreeSet::new(),
            opts,
        )
    }

    #[test]
    fn target_without_prefix_mirrors_relative_path() {
        let opts = SyncOptions::default();
        let w = walker(&opts);
        assert_eq!(
            w.target_for(Path::new("/src/config/nvim")).as_os_str(),
            PathBuf::from("/home/user/config/nvim").as_os_str()
        );
    }

    #[test]
    fn prefix_applies_to_first_component_only() {
        let opts = SyncOptions {
            prefix: ".".to_string(),
            ..SyncOptions::default()
        };
        let w = walker(&opts);
        assert_eq!(
            w.target_for(Path::new("/src/bashrc")).as_os_str(),
            PathBuf::from("/home/user/.bashrc").as_os_str()
        );
        assert_eq!(
            w.target_for(Path::new("/src/config/nvim")).as_os_str(),
            PathBuf::from("/home/user/.config/nvim").as_os_str()
        );
    }

    #[test]
    fn root_level_file_has_no_trailing_separator() {
        let opts = SyncOptions::default();
        let w = walker(&opts);
        assert_eq!(
            w.target_for(Path::new("/src/gitconfig")).as_os_str(),
            PathBuf::from("/home/user/gitconfig").as_os_str()
        );
    }

    #[test]
    fn read_entries_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            std::fs::write(tmp.path().join(name), "").unwrap();
        }
        let names: Vec<_> = read_entries(tmp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn unreadable_subdirectory_is_one_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("config")).unwrap();
        std::fs::write(src.join("config/fish"), "").unwrap();
        let opts = SyncOptions::default();
        let w = Walker::new(
            src.clone(),
            tmp.path().join("home"),
            ExcludeSet::default(),
            BTreeSet::new(),
            &opts,
        );

        let entry = w
            .root_entries()
            .unwrap()
            .into_iter()
            .find(|e| e.path.ends_with("config"))
            .unwrap();
        // Swap the directory for a file after it was listed as one.
        std::fs::remove_dir_all(src.join("config")).unwrap();
        std::fs::write(src.join("config"), "").unwrap();

        let Step::Done(result) = w.step(entry) else {
            panic!("an unreadable directory must not be descended into");
        };
        assert_eq!(result.outcome, Outcome::Conflict);
        assert_eq!(result.source, src.join("config"));
        assert!(
            result
                .detail
                .as_deref()
                .unwrap()
                .starts_with("cannot read source directory")
        );
    }

    #[test]
    fn cancelled_flag_stops_before_first_entry() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a"), "").unwrap();
        let flag = std::sync::Arc::new(AtomicBool::new(true));
        let opts = SyncOptions {
            cancel: Some(flag),
            ..SyncOptions::default()
        };
        let w = Walker::new(
            tmp.path().to_path_buf(),
            tmp.path().join("home"),
            ExcludeSet::default(),
            BTreeSet::new(),
            &opts,
        );
        let report = w.walk().unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }
}
