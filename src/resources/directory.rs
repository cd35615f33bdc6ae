//! Real intermediate directory resource.
use anyhow::{Context as _, Result};
use std::io;
use std::path::{Path, PathBuf};

use super::{Resource, ResourceState, fs};

/// A real directory at `target` mirroring the plain source directory `source`.
///
/// Never replaced: a non-directory in the way is a conflict and a symlink in
/// the way stops the descent.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// The source directory.
    pub source: PathBuf,
    /// The directory to ensure under the target root.
    pub target: PathBuf,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Resource for DirectoryResource {
    fn source(&self) -> &Path {
        &self.source
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn description(&self) -> String {
        format!("{}/", self.target.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        match std::fs::symlink_metadata(&self.target) {
            Ok(meta) if meta.is_symlink() => Ok(ResourceState::ParentIsLink {
                parent: self.target.clone(),
            }),
            Ok(meta) if meta.is_dir() => Ok(ResourceState::Correct),
            Ok(_) => Ok(ResourceState::Invalid {
                reason: "target exists and is not a directory".to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok(fs::nearest_link_ancestor(&self.target)?
                    .map_or(ResourceState::Missing, |parent| {
                        ResourceState::ParentIsLink { parent }
                    }))
            }
            Err(e) => {
                Err(e).with_context(|| format!("reading metadata: {}", self.target.display()))
            }
        }
    }

    fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.target)
            .with_context(|| format!("create directory: {}", self.target.display()))
    }
}
