//! Tree synchronization: mirror a source tree onto a target tree with symlinks.
//!
//! A run validates its inputs, computes the marker set once, then walks the
//! source top-down in lexicographic order.  Excluded entries are recorded and
//! pruned, marker directories and files are linked as leaves, and plain
//! directories become real directories at the target that the walk descends
//! into.  Per-entry problems are recorded as conflicts; only invalid inputs
//! and an unreadable source root abort the run.
mod parallel;
mod walk;

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::error::{ConfigError, SyncError};
use crate::markers::{DEFAULT_DIRECTORY_MARKER, MarkerDetector};
use crate::patterns::ExcludeSet;
use crate::result::SyncReport;

use walk::Walker;

/// Options for one synchronization run.
///
/// # Examples
///
/// ```
/// use symlink_dotfiles::sync::SyncOptions;
///
/// let opts = SyncOptions {
///     prefix: ".".to_string(),
///     force: true,
///     ..SyncOptions::default()
/// };
/// assert!(opts.default_excludes);
/// assert_eq!(opts.marker_name, ".symlink-as-directory");
/// ```
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Caller patterns, appended to the defaults.
    pub exclude_patterns: Vec<String>,
    /// Whether the built-in exclude patterns apply.
    pub default_excludes: bool,
    /// File name that marks a directory for atomic linking.
    pub marker_name: String,
    /// Replace replaceable targets instead of reporting conflicts.
    pub force: bool,
    /// String prepended to the first component of every target path.
    pub prefix: String,
    /// Top-level source entries skipped by name.
    pub exclude_dirs: Vec<String>,
    /// Directories always linked atomically, relative to the source root
    /// (absolute paths under the source root are accepted).
    pub profile_roots: Vec<PathBuf>,
    /// Compute outcomes without touching the filesystem.
    pub dry_run: bool,
    /// Process each directory level with rayon.
    pub parallel: bool,
    /// Cooperative cancellation flag, checked before each entry.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Log and skip missing sources in [`sync_profiles`] instead of failing.
    pub skip_missing_sources: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            default_excludes: true,
            marker_name: DEFAULT_DIRECTORY_MARKER.to_string(),
            force: false,
            prefix: String::new(),
            exclude_dirs: Vec::new(),
            profile_roots: Vec::new(),
            dry_run: false,
            parallel: false,
            cancel: None,
            skip_missing_sources: false,
        }
    }
}

/// Synchronize `source_root` onto `target_root`.
///
/// Absolute entries of [`SyncOptions::profile_roots`] that lie outside
/// `source_root` are ignored here; [`validate_sources`] rejects roots that
/// match no source of a run.
///
/// # Errors
///
/// Returns [`SyncError::Config`] for invalid inputs (nothing is touched in
/// that case) and [`SyncError::Traversal`] if the source root cannot be read.
pub fn symlink_dotfiles(
    source_root: &Path,
    target_root: &Path,
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let walker = prepare(source_root, target_root, opts)?;
    let report = if opts.parallel {
        parallel::walk(&walker)?
    } else {
        walker.walk()?
    };
    tracing::debug!(
        source = %walker.source_root().display(),
        results = report.results.len(),
        cancelled = report.cancelled,
        "synchronized"
    );
    Ok(report)
}

/// Synchronize each of `sources` onto `target_root` in order and concatenate
/// the reports.
///
/// Every source is validated with [`validate_sources`] before the first one
/// is processed.  A run that is cancelled stops before the next source.
///
/// # Errors
///
/// Returns any error from [`validate_sources`] (nothing is touched in that
/// case) and any error from [`symlink_dotfiles`].
pub fn sync_profiles(
    sources: &[PathBuf],
    target_root: &Path,
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let sources = validate_sources(sources, target_root, opts)?;
    let mut report = SyncReport {
        dry_run: opts.dry_run,
        ..SyncReport::default()
    };
    for source in &sources {
        report.extend(symlink_dotfiles(source, target_root, opts)?);
        if report.cancelled {
            break;
        }
    }
    Ok(report)
}

/// Check a whole multi-source run without touching the filesystem.
///
/// Runs every per-source check of [`symlink_dotfiles`] for each source, and
/// requires each absolute profile root to lie inside at least one of them.
/// Returns the sources that will be processed.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found: see [`resolve_sources`] for
/// source existence, plus an invalid marker name or glob, a source root
/// matched by an exclude pattern, a misplaced profile root, or a target root
/// that is not a directory.
pub fn validate_sources(
    sources: &[PathBuf],
    target_root: &Path,
    opts: &SyncOptions,
) -> Result<Vec<PathBuf>, ConfigError> {
    let sources = resolve_sources(sources, opts.skip_missing_sources)?;
    validate_marker_name(&opts.marker_name)?;
    let excludes = ExcludeSet::with_defaults(&opts.exclude_patterns, opts.default_excludes)?;

    let mut roots = Vec::with_capacity(sources.len());
    for source in &sources {
        let root = dunce::canonicalize(source).map_err(|e| io_error(source, e))?;
        excludes.check_root(&root)?;
        roots.push(root);
    }
    for profile in &opts.profile_roots {
        let inside_some = roots
            .iter()
            .any(|root| matches!(profile_root_under(profile, root), Some(Ok(_))));
        if !inside_some {
            return Err(ConfigError::ProfileOutsideSource {
                profile: profile.clone(),
            });
        }
    }
    check_target_root(target_root)?;
    Ok(sources)
}

/// Check that every source exists and is a directory.
///
/// With `skip_missing`, sources that do not exist are logged and dropped.
///
/// # Errors
///
/// Returns [`ConfigError::NoSources`] if `sources` is empty, or the first
/// source that is missing (without `skip_missing`) or not a directory.
pub fn resolve_sources(
    sources: &[PathBuf],
    skip_missing: bool,
) -> Result<Vec<PathBuf>, ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::NoSources);
    }
    let mut resolved = Vec::with_capacity(sources.len());
    for source in sources {
        match check_source(source) {
            Ok(()) => resolved.push(source.clone()),
            Err(ConfigError::SourceMissing(path)) if skip_missing => {
                tracing::warn!("skipping missing source: {}", path.display());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(resolved)
}

fn check_source(source: &Path) -> Result<(), ConfigError> {
    match std::fs::metadata(source) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::SourceNotDirectory(source.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ConfigError::SourceMissing(source.to_path_buf()))
        }
        Err(e) => Err(io_error(source, e)),
    }
}

fn io_error(path: &Path, source: io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn validate_marker_name(name: &str) -> Result<(), ConfigError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(ConfigError::InvalidMarkerName(name.to_string()));
    }
    Ok(())
}

/// `profile` relative to `source_root`.
///
/// Returns `None` for an absolute root under a different source, and an
/// error for a relative root that is empty of plain components or escapes
/// with `..`.
fn profile_root_under(profile: &Path, source_root: &Path) -> Option<Result<PathBuf, ConfigError>> {
    let rel = if profile.is_absolute() {
        let canonical = dunce::canonicalize(profile).unwrap_or_else(|_| profile.to_path_buf());
        canonical.strip_prefix(source_root).ok()?.to_path_buf()
    } else {
        profile.to_path_buf()
    };
    let escapes = rel
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if escapes {
        return Some(Err(ConfigError::ProfileOutsideSource {
            profile: profile.to_path_buf(),
        }));
    }
    Some(Ok(rel))
}

/// Normalize profile roots to paths relative to `source_root`.
///
/// Absolute roots belonging to other sources are dropped.
fn relative_profile_roots(
    profile_roots: &[PathBuf],
    source_root: &Path,
) -> Result<Vec<PathBuf>, ConfigError> {
    let mut roots = Vec::with_capacity(profile_roots.len());
    for profile in profile_roots {
        let Some(rel) = profile_root_under(profile, source_root) else {
            tracing::debug!(
                "profile root {} belongs to another source",
                profile.display()
            );
            continue;
        };
        let rel = rel?;
        if rel.as_os_str().is_empty() {
            tracing::debug!("ignoring profile root equal to the source root");
            continue;
        }
        roots.push(rel);
    }
    Ok(roots)
}

/// Reject a target root that exists but is not a directory.
fn check_target_root(target_root: &Path) -> Result<(), ConfigError> {
    match std::fs::metadata(target_root) {
        Ok(meta) if !meta.is_dir() => Err(ConfigError::TargetNotDirectory(
            target_root.to_path_buf(),
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(target_root, e)),
    }
}

/// Ensure the target root is a directory and return its canonical form.
///
/// In dry run a missing target root is not created.
fn prepare_target_root(target_root: &Path, dry_run: bool) -> Result<PathBuf, ConfigError> {
    match std::fs::metadata(target_root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ConfigError::TargetNotDirectory(target_root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if dry_run {
                return std::path::absolute(target_root).map_err(|e| io_error(target_root, e));
            }
            std::fs::create_dir_all(target_root).map_err(|e| io_error(target_root, e))?;
        }
        Err(e) => return Err(io_error(target_root, e)),
    }
    dunce::canonicalize(target_root).map_err(|e| io_error(target_root, e))
}

/// Validate inputs and compute everything a walk needs, touching at most the
/// target root.
fn prepare<'a>(
    source_root: &Path,
    target_root: &Path,
    opts: &'a SyncOptions,
) -> Result<Walker<'a>, ConfigError> {
    check_source(source_root)?;
    let source_root = dunce::canonicalize(source_root).map_err(|e| io_error(source_root, e))?;
    validate_marker_name(&opts.marker_name)?;

    let excludes = ExcludeSet::with_defaults(&opts.exclude_patterns, opts.default_excludes)?;
    excludes.check_root(&source_root)?;
    let profile_roots = relative_profile_roots(&opts.profile_roots, &source_root)?;

    let target_root = prepare_target_root(target_root, opts.dry_run)?;

    let markers: BTreeSet<PathBuf> = MarkerDetector::new(&opts.marker_name)
        .with_profile_roots(&profile_roots)
        .with_excludes(&excludes)
        .scan(&source_root);
    tracing::debug!(
        source = %source_root.display(),
        target = %target_root.display(),
        markers = markers.len(),
        "prepared run"
    );

    Ok(Walker::new(source_root, target_root, excludes, markers, opts))
}
