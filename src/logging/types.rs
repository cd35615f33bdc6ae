//! Core logging types: per-profile entries, status, and the [`Log`] trait.
use std::path::PathBuf;

use crate::result::Counts;

/// Outcome of one profile's run, for summary reporting.
#[derive(Debug, Clone)]
pub struct ProfileEntry {
    /// Source directory that was synchronized.
    pub source: PathBuf,
    /// Final status of the run.
    pub status: ProfileStatus,
    /// Per-outcome counters.
    pub counts: Counts,
}

/// Status of a completed profile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// Every entry is in place.
    Ok,
    /// Outcomes were computed without touching the filesystem.
    DryRun,
    /// At least one entry was left as a conflict.
    Conflicts,
    /// The run stopped early on cancellation.
    Cancelled,
}

impl ProfileStatus {
    /// Classify a finished run.
    #[must_use]
    pub const fn from_run(counts: &Counts, dry_run: bool, cancelled: bool) -> Self {
        if cancelled {
            Self::Cancelled
        } else if counts.conflicts > 0 {
            Self::Conflicts
        } else if dry_run {
            Self::DryRun
        } else {
            Self::Ok
        }
    }
}

/// Abstraction over logging backends.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a profile result for the summary.
    fn record_profile(&self, entry: ProfileEntry);
}
