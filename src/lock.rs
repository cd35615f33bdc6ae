//! Advisory per-target run lock.
//!
//! Runs that link into the same target root are serialised by holding an
//! exclusive [`fs2`] lock on `<cache>/locks/<sha256 of target>.lock` for the
//! duration of the run.  The lock is released when the guard is dropped.
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest, Sha256};

use crate::error::ConfigError;

/// Held exclusive lock for one target root.
#[derive(Debug)]
pub struct TargetLock {
    file: File,
    path: PathBuf,
}

impl TargetLock {
    /// Try to lock `target_root` using lock files under `lock_dir`.
    ///
    /// Does not wait: a lock held by another process fails immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Locked`] if another run holds the lock, or
    /// [`ConfigError::Io`] if the lock file cannot be created.
    pub fn acquire(lock_dir: &Path, target_root: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(lock_dir).map_err(|source| ConfigError::Io {
            path: lock_dir.to_path_buf(),
            source,
        })?;
        let path = lock_dir.join(lock_file_name(target_root));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                return Err(ConfigError::Locked(target_root.to_path_buf()));
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        }
        tracing::debug!("acquired lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Lock file backing this guard.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        let _: io::Result<()> = FileExt::unlock(&self.file);
    }
}

/// Lock file name for `target_root`: the hex SHA-256 of its canonical path.
#[must_use]
pub fn lock_file_name(target_root: &Path) -> String {
    let canonical = dunce::canonicalize(target_root).unwrap_or_else(|_| target_root.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let mut name = String::with_capacity(digest.len() * 2 + ".lock".len());
    for b in digest {
        write!(name, "{b:02x}").unwrap_or(());
    }
    name.push_str(".lock");
    name
}
