//! Idempotent resource primitives (check + apply pattern).
//!
//! Each resource reports its [`ResourceState`] without side effects; [`apply`]
//! turns that state plus the caller's [`ApplyOpts`] into exactly one
//! [`SymlinkResult`], mutating the filesystem only when the state calls for it.
pub mod directory;
pub mod fs;
pub mod symlink;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::result::{Outcome, SymlinkResult};

/// State of a target path relative to what the resource wants there.
///
/// # Examples
///
/// ```
/// use symlink_dotfiles::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
/// let blocked = ResourceState::Invalid { reason: "target is a non-empty directory".into() };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert!(wrong.is_replaceable());
/// assert!(!blocked.is_replaceable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the target.
    Missing,
    /// The target already matches.
    Correct,
    /// The target holds something that `force` may replace without losing data.
    Incorrect {
        /// What is there now.
        current: String,
    },
    /// The target holds something that is never replaced.
    Invalid {
        /// Why it cannot be replaced.
        reason: String,
    },
    /// The target would be written through a symlinked directory.
    ParentIsLink {
        /// The symlinked directory.
        parent: PathBuf,
    },
}

impl ResourceState {
    /// Whether `force` is allowed to replace this state.
    #[must_use]
    pub const fn is_replaceable(&self) -> bool {
        matches!(self, Self::Incorrect { .. })
    }
}

/// Interface for resources that can be checked and brought into place.
pub trait Resource {
    /// Path under the source root this resource mirrors.
    fn source(&self) -> &Path;

    /// Path under the target root this resource manages.
    fn target(&self) -> &Path;

    /// Human-readable description of this resource.
    fn description(&self) -> String {
        format!("{} -> {}", self.target().display(), self.source().display())
    }

    /// Inspect the target without modifying anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the target's state cannot be determined.
    fn current_state(&self) -> Result<ResourceState>;

    /// Create the resource where nothing exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the filesystem refuses the change.
    fn create(&self) -> Result<()>;

    /// Replace an [`Incorrect`](ResourceState::Incorrect) target.
    ///
    /// Implementations restore the previous entry if the replacement fails.
    /// Returns an optional detail message (e.g. a backup location).
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be replaced; the default
    /// implementation always does.
    fn replace(&self) -> Result<Option<String>> {
        anyhow::bail!(
            "operation 'replace' is not supported for resource '{}'",
            self.description()
        )
    }
}

/// Options controlling how [`apply`] acts on a resource's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOpts {
    /// Replace [`Incorrect`](ResourceState::Incorrect) targets.
    pub force: bool,
    /// Compute the outcome without touching the filesystem.
    pub dry_run: bool,
}

/// Check `resource` and bring it into place, returning one result.
///
/// Errors from inspecting or mutating the target are downgraded to
/// [`Outcome::Conflict`] with the error chain as the detail.
pub fn apply(resource: &dyn Resource, opts: ApplyOpts) -> SymlinkResult {
    let (source, target) = (resource.source(), resource.target());
    let result = match resource.current_state() {
        Err(e) => SymlinkResult::conflict(source, target, format!("{e:#}")),
        Ok(ResourceState::Correct) => SymlinkResult::new(source, target, Outcome::AlreadyCorrect),
        Ok(ResourceState::ParentIsLink { parent }) => {
            SymlinkResult::new(source, target, Outcome::SkippedParentIsLink)
                .with_detail(format!("{} is a symlink", parent.display()))
        }
        Ok(ResourceState::Invalid { reason }) => SymlinkResult::conflict(source, target, reason),
        Ok(ResourceState::Missing) if opts.dry_run => {
            SymlinkResult::new(source, target, Outcome::Created).with_detail("dry run")
        }
        Ok(ResourceState::Missing) => match resource.create() {
            Ok(()) => SymlinkResult::new(source, target, Outcome::Created),
            Err(e) => SymlinkResult::conflict(source, target, format!("{e:#}")),
        },
        Ok(ResourceState::Incorrect { current }) if !opts.force => {
            SymlinkResult::conflict(source, target, current)
        }
        Ok(ResourceState::Incorrect { current }) if opts.dry_run => {
            SymlinkResult::new(source, target, Outcome::Replaced)
                .with_detail(format!("dry run: {current}"))
        }
        Ok(ResourceState::Incorrect { current }) => match resource.replace() {
            Ok(detail) => SymlinkResult::new(source, target, Outcome::Replaced)
                .with_detail(detail.unwrap_or(current)),
            Err(e) => SymlinkResult::conflict(source, target, format!("{e:#}")),
        },
    };

    tracing::debug!(
        outcome = %result.outcome,
        detail = result.detail.as_deref().unwrap_or(""),
        "{}",
        resource.description()
    );
    result
}
