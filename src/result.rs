//! Per-entry results and the aggregated run report.
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Outcome of a single decided entry.
///
/// # Examples
///
/// ```
/// use symlink_dotfiles::result::Outcome;
///
/// assert!(Outcome::Created.is_change());
/// assert!(!Outcome::AlreadyCorrect.is_change());
/// assert_eq!(Outcome::SkippedParentIsLink.to_string(), "skipped-parent-is-link");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// A new symlink was created.
    Created,
    /// The symlink already pointed at the source; nothing was touched.
    AlreadyCorrect,
    /// An existing entry was replaced (only with `force`).
    Replaced,
    /// The target is occupied and was left untouched.
    Conflict,
    /// The source path matched an exclude rule.
    Excluded,
    /// The target's parent is a symlink; writing would go through it.
    SkippedParentIsLink,
}

impl Outcome {
    /// All outcomes in report order.
    pub const ALL: [Self; 6] = [
        Self::Created,
        Self::AlreadyCorrect,
        Self::Replaced,
        Self::Conflict,
        Self::Excluded,
        Self::SkippedParentIsLink,
    ];

    /// Whether this outcome reflects a filesystem mutation.
    #[must_use]
    pub const fn is_change(self) -> bool {
        matches!(self, Self::Created | Self::Replaced)
    }

    /// Stable kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyCorrect => "already-correct",
            Self::Replaced => "replaced",
            Self::Conflict => "conflict",
            Self::Excluded => "excluded",
            Self::SkippedParentIsLink => "skipped-parent-is-link",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per decided entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymlinkResult {
    /// Path under the source root.
    pub source: PathBuf,
    /// Corresponding path under the target root.
    pub target: PathBuf,
    /// What happened.
    pub outcome: Outcome,
    /// Optional human-readable detail (conflict reason, backup path, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SymlinkResult {
    /// Build a result without a detail message.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>, outcome: Outcome) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            outcome,
            detail: None,
        }
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Shorthand for a conflict with a reason.
    #[must_use]
    pub fn conflict(source: &Path, target: &Path, reason: impl Into<String>) -> Self {
        Self::new(source, target, Outcome::Conflict).with_detail(reason)
    }
}

/// Per-outcome counters.
///
/// # Examples
///
/// ```
/// use symlink_dotfiles::result::Counts;
///
/// let counts = Counts { created: 3, already_correct: 10, ..Counts::default() };
/// assert_eq!(counts.summary(false), "3 created, 0 replaced, 10 already ok, 0 conflicts, 0 excluded, 0 skipped");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Number of `created` results.
    pub created: usize,
    /// Number of `already-correct` results.
    pub already_correct: usize,
    /// Number of `replaced` results.
    pub replaced: usize,
    /// Number of `conflict` results.
    pub conflicts: usize,
    /// Number of `excluded` results.
    pub excluded: usize,
    /// Number of `skipped-parent-is-link` results.
    pub skipped: usize,
}

impl Counts {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::AlreadyCorrect => self.already_correct += 1,
            Outcome::Replaced => self.replaced += 1,
            Outcome::Conflict => self.conflicts += 1,
            Outcome::Excluded => self.excluded += 1,
            Outcome::SkippedParentIsLink => self.skipped += 1,
        }
    }

    /// One-line summary; `dry_run` switches to conditional wording.
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let (created, replaced) = if dry_run {
            ("would create", "would replace")
        } else {
            ("created", "replaced")
        };
        format!(
            "{} {created}, {} {replaced}, {} already ok, {} conflicts, {} excluded, {} skipped",
            self.created,
            self.replaced,
            self.already_correct,
            self.conflicts,
            self.excluded,
            self.skipped
        )
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.already_correct += rhs.already_correct;
        self.replaced += rhs.replaced;
        self.conflicts += rhs.conflicts;
        self.excluded += rhs.excluded;
        self.skipped += rhs.skipped;
    }
}

/// Ordered results of one or more synchronization runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Results in traversal order.
    pub results: Vec<SymlinkResult>,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
    /// Whether outcomes were computed without touching the filesystem.
    pub dry_run: bool,
}

impl SyncReport {
    /// Count results by outcome.
    #[must_use]
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for result in &self.results {
            counts.add(result.outcome);
        }
        counts
    }

    /// Whether any entry was (or, in dry run, would be) changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.results.iter().any(|r| r.outcome.is_change())
    }

    /// Results with a `conflict` outcome.
    pub fn conflicts(&self) -> impl Iterator<Item = &SymlinkResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == Outcome::Conflict)
    }

    /// Whether the run should be reported as failed.
    ///
    /// Conflicts are only a failure when the caller did not ask for `force`.
    #[must_use]
    pub fn failed(&self, force: bool) -> bool {
        !force && self.conflicts().next().is_some()
    }

    /// Append another report's results, keeping order.
    pub fn extend(&mut self, other: Self) {
        self.results.extend(other.results);
        self.cancelled |= other.cancelled;
        self.dry_run |= other.dry_run;
    }

    /// Machine-readable summary for scripting callers.
    #[must_use]
    pub fn to_json(&self, force: bool) -> serde_json::Value {
        let counts = self.counts();
        let conflicts: Vec<serde_json::Value> = self
            .conflicts()
            .map(|r| {
                serde_json::json!({
                    "target": r.target,
                    "reason": r.detail,
                })
            })
            .collect();
        serde_json::json!({
            "changed": self.changed(),
            "failed": self.failed(force),
            "cancelled": self.cancelled,
            "dry_run": self.dry_run,
            "counts": counts,
            "conflicts": conflicts,
            "results": self.results,
        })
    }
}
