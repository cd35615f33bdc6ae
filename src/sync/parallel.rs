//! Rayon-based level-by-level walk.
//!
//! Each level's entries are decided concurrently; the children of every
//! directory that was descended into form the next level.  Results are
//! sorted by source path at the end, which reproduces the sequential order.
use rayon::prelude::*;

use super::walk::{Step, Walker};
use crate::error::SyncError;
use crate::result::{SymlinkResult, SyncReport};

/// Walk the source tree, processing each level in parallel.
///
/// # Errors
///
/// Returns [`SyncError::Traversal`] if the source root cannot be read.
pub(super) fn walk(walker: &Walker<'_>) -> Result<SyncReport, SyncError> {
    let mut frontier = walker.root_entries()?;
    let mut results: Vec<SymlinkResult> = Vec::new();

    while !frontier.is_empty() {
        let steps: Vec<Step> = frontier.into_par_iter().map(|e| walker.step(e)).collect();
        frontier = Vec::new();
        for step in steps {
            match step {
                Step::Done(result) => results.push(result),
                Step::Descend(children) => frontier.extend(children),
                Step::Cancelled => {}
            }
        }
    }

    Ok(walker.finish(results))
}
