//! Symlink resource.
use anyhow::{Context as _, Result};
use std::io;
use std::path::{Path, PathBuf};

use super::{ApplyOpts, Resource, ResourceState, apply, fs};
use crate::result::SymlinkResult;

/// A symlink at `target` pointing to `source`.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// The source file/directory (what the symlink points to).
    pub source: PathBuf,
    /// The target path (where the symlink will be created).
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    /// Where an existing link at `target` points, resolved against the
    /// link's parent when stored relative.
    fn resolved_link(&self) -> Result<PathBuf> {
        let existing = std::fs::read_link(&self.target)
            .with_context(|| format!("reading link: {}", self.target.display()))?;
        if existing.is_absolute() {
            return Ok(existing);
        }
        Ok(self
            .target
            .parent()
            .map_or_else(|| existing.clone(), |parent| parent.join(&existing)))
    }

    fn link(&self) -> Result<()> {
        fs::create_symlink(&self.source, &self.target)
            .with_context(|| format!("create link: {}", self.target.display()))
    }

    fn replace_link(&self) -> Result<Option<String>> {
        let previous = std::fs::read_link(&self.target)
            .with_context(|| format!("reading link: {}", self.target.display()))?;
        fs::remove_symlink(&self.target)?;
        if let Err(e) = self.link() {
            fs::create_symlink(&previous, &self.target).with_context(|| {
                format!("restoring previous link: {}", self.target.display())
            })?;
            return Err(e);
        }
        Ok(Some(format!("previously pointed to {}", previous.display())))
    }

    fn replace_file(&self) -> Result<Option<String>> {
        let backup = fs::backup_path(&self.target);
        if backup.symlink_metadata().is_ok() {
            anyhow::bail!("backup already exists: {}", backup.display());
        }
        std::fs::rename(&self.target, &backup)
            .with_context(|| format!("moving aside: {}", self.target.display()))?;
        if let Err(e) = self.link() {
            std::fs::rename(&backup, &self.target)
                .with_context(|| format!("restoring: {}", self.target.display()))?;
            return Err(e);
        }
        Ok(Some(format!("backed up to {}", backup.display())))
    }

    fn replace_empty_dir(&self) -> Result<Option<String>> {
        std::fs::remove_dir(&self.target)
            .with_context(|| format!("removing empty directory: {}", self.target.display()))?;
        if let Err(e) = self.link() {
            std::fs::create_dir(&self.target)
                .with_context(|| format!("restoring directory: {}", self.target.display()))?;
            return Err(e);
        }
        Ok(Some("replaced empty directory".to_string()))
    }
}

impl Resource for SymlinkResource {
    fn source(&self) -> &Path {
        &self.source
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn current_state(&self) -> Result<ResourceState> {
        if let Some(parent) = fs::nearest_link_ancestor(&self.target)? {
            return Ok(ResourceState::ParentIsLink { parent });
        }

        if self.source.symlink_metadata().is_err() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        let meta = match std::fs::symlink_metadata(&self.target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ResourceState::Missing),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading metadata: {}", self.target.display()));
            }
        };

        if meta.is_symlink() {
            let existing = self.resolved_link()?;
            return Ok(if fs::paths_equal(&existing, &self.source) {
                ResourceState::Correct
            } else {
                ResourceState::Incorrect {
                    current: format!("points to {}", existing.display()),
                }
            });
        }

        if meta.is_file() {
            let backup = fs::backup_path(&self.target);
            if backup.symlink_metadata().is_ok() {
                return Ok(ResourceState::Invalid {
                    reason: format!(
                        "target is a regular file and backup {} already exists",
                        backup.display()
                    ),
                });
            }
            return Ok(ResourceState::Incorrect {
                current: "target is a regular file".to_string(),
            });
        }

        if meta.is_dir() {
            let mut entries = std::fs::read_dir(&self.target)
                .with_context(|| format!("reading directory: {}", self.target.display()))?;
            return Ok(if entries.next().is_none() {
                ResourceState::Incorrect {
                    current: "target is an empty directory".to_string(),
                }
            } else {
                ResourceState::Invalid {
                    reason: "target is a non-empty directory".to_string(),
                }
            });
        }

        Ok(ResourceState::Invalid {
            reason: "target is a special file".to_string(),
        })
    }

    fn create(&self) -> Result<()> {
        fs::ensure_parent_dir(&self.target)?;
        self.link()
    }

    fn replace(&self) -> Result<Option<String>> {
        let meta = std::fs::symlink_metadata(&self.target)
            .with_context(|| format!("reading metadata: {}", self.target.display()))?;
        if meta.is_symlink() {
            self.replace_link()
        } else if meta.is_file() {
            self.replace_file()
        } else if meta.is_dir() {
            self.replace_empty_dir()
        } else {
            anyhow::bail!("refusing to replace: {}", self.target.display())
        }
    }
}

/// Make `target` a symlink to `source`, returning what happened.
///
/// `source` is stored as an absolute path.  Without `force`, anything
/// already at `target` other than the correct link is a conflict; with
/// `force`, links are repointed, regular files are moved aside to a
/// `.symlink-dotfiles.bak` sibling and empty directories are removed.
/// Non-empty directories are never touched.
#[must_use]
pub fn create_symlink(source: &Path, target: &Path, force: bool) -> SymlinkResult {
    link_with(source, target, ApplyOpts { force, dry_run: false })
}

/// Compute the outcome [`create_symlink`] would report without touching the
/// filesystem.
#[must_use]
pub fn plan_symlink(source: &Path, target: &Path, force: bool) -> SymlinkResult {
    link_with(source, target, ApplyOpts { force, dry_run: true })
}

pub(crate) fn link_with(source: &Path, target: &Path, opts: ApplyOpts) -> SymlinkResult {
    match std::path::absolute(source) {
        Ok(source) => apply(&SymlinkResource::new(source, target.to_path_buf()), opts),
        Err(e) => SymlinkResult::conflict(
            source,
            target,
            format!("resolving source {}: {e}", source.display()),
        ),
    }
}
