//! Domain-specific error types for the synchronization engine.
//!
//! Library code returns typed errors built with [`thiserror`]; the command
//! layer converts them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! SyncError
//! ├── Config(ConfigError): invalid inputs, fatal before any mutation
//! └── Traversal { .. }: the source root itself cannot be read
//! ```
//!
//! Per-entry problems (conflicts, permission errors, unreadable
//! subdirectories) are never errors: they become
//! [`Outcome::Conflict`](crate::result::Outcome::Conflict) results.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a synchronization run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The run was misconfigured; nothing was touched.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source root could not be enumerated, so no result set is meaningful.
    #[error("cannot read source tree {}: {source}", path.display())]
    Traversal {
        /// Directory that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Invalid inputs detected before the walk starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The source root does not exist.
    #[error("source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The source root exists but is not a directory.
    #[error("source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// The target root is occupied by something other than a directory.
    #[error("target is not a directory: {}", .0.display())]
    TargetNotDirectory(PathBuf),

    /// An exclude pattern matches the source root itself.
    #[error("exclude pattern '{pattern}' excludes the source root {}", root.display())]
    RootExcluded {
        /// Offending pattern.
        pattern: String,
        /// Source root that would be skipped entirely.
        root: PathBuf,
    },

    /// An exclude pattern is not a valid glob.
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// The marker name is empty or contains a path separator.
    #[error("invalid marker name '{0}': must be a single non-empty file name")]
    InvalidMarkerName(String),

    /// A profile root lies outside every source root of the run.
    #[error("profile root {} is not inside any source", profile.display())]
    ProfileOutsideSource {
        /// Configured profile root.
        profile: PathBuf,
    },

    /// No source directories were given.
    #[error("no source directories given")]
    NoSources,

    /// No target directory was given and none could be derived.
    #[error("no target directory given and HOME is not set")]
    NoTarget,

    /// Another run currently holds the lock for this target root.
    #[error("another run is already linking into {}", .0.display())]
    Locked(PathBuf),

    /// An input path (config file, source or target root) could not be read.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("invalid config file {}: {message}", path.display())]
    Parse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}
