// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed source/target pair and a fluent
// builder so each integration test can lay out a dotfiles profile without
// repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use symlink_dotfiles::markers::DEFAULT_DIRECTORY_MARKER;
use symlink_dotfiles::result::{Outcome, SyncReport};

/// A source profile and an empty target root inside one [`tempfile::TempDir`].
///
/// Both paths are canonical so they compare equal to the paths in results.
/// The directory is deleted when the context is dropped.
pub struct SyncContext {
    root: tempfile::TempDir,
    /// Source profile directory (`<tmp>/dotfiles/base`).
    pub source: PathBuf,
    /// Target root (`<tmp>/home`).
    pub target: PathBuf,
}

impl SyncContext {
    /// Create a context with empty `dotfiles/base` and `home` directories.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let base = dunce::canonicalize(root.path()).expect("canonicalize temp dir");
        let source = base.join("dotfiles").join("base");
        let target = base.join("home");
        std::fs::create_dir_all(&source).expect("create source dir");
        std::fs::create_dir_all(&target).expect("create target dir");
        Self {
            root,
            source,
            target,
        }
    }

    /// Temporary directory containing both trees.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Create another profile directory next to `base` and return its path.
    pub fn profile(&self, name: &str) -> PathBuf {
        let path = self.source.with_file_name(name);
        std::fs::create_dir_all(&path).expect("create profile dir");
        path
    }

    /// Path under the target root.
    pub fn target_path(&self, rel: &str) -> PathBuf {
        self.target.join(rel)
    }

    /// Path under the source root.
    pub fn source_path(&self, rel: &str) -> PathBuf {
        self.source.join(rel)
    }
}

/// Fluent builder for the source side of a [`SyncContext`].
pub struct SourceTree {
    ctx: SyncContext,
}

impl SourceTree {
    /// Begin building on a fresh context.
    pub fn new() -> Self {
        Self {
            ctx: SyncContext::new(),
        }
    }

    /// Write a file at `rel` under the source root, creating parents.
    pub fn file(self, rel: &str) -> Self {
        self.file_with(rel, "")
    }

    /// Write a file with `content` at `rel` under the source root.
    pub fn file_with(self, rel: &str, content: &str) -> Self {
        let path = self.ctx.source.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source parent");
        }
        std::fs::write(&path, content).expect("write source file");
        self
    }

    /// Create an empty directory at `rel` under the source root.
    pub fn dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.ctx.source.join(rel)).expect("create source dir");
        self
    }

    /// Create a directory at `rel` holding the default marker and one file.
    pub fn marker_dir(self, rel: &str) -> Self {
        self.file(&format!("{rel}/{DEFAULT_DIRECTORY_MARKER}"))
            .file(&format!("{rel}/init"))
    }

    /// Write a regular file at `rel` under the target root.
    pub fn target_file(self, rel: &str, content: &str) -> Self {
        let path = self.ctx.target.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create target parent");
        }
        std::fs::write(&path, content).expect("write target file");
        self
    }

    /// Finish building and return the context.
    pub fn build(self) -> SyncContext {
        self.ctx
    }
}

/// `(relative target, outcome)` pairs for compact assertions.
pub fn outcomes(report: &SyncReport, target_root: &Path) -> Vec<(String, Outcome)> {
    report
        .results
        .iter()
        .map(|r| {
            let rel = r.target.strip_prefix(target_root).unwrap_or(&r.target);
            (rel.to_string_lossy().replace('\\', "/"), r.outcome)
        })
        .collect()
}

/// Whether `path` is a symlink resolving to `expected`.
pub fn links_to(path: &Path, expected: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
        && dunce::canonicalize(path).ok().as_deref()
            == dunce::canonicalize(expected).ok().as_deref()
}
