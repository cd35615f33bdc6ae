//! Dotfiles symlink synchronization engine.
//!
//! Mirrors one or more *source* profile directories onto a *target* tree
//! (typically `$HOME`) with symlinks, so edits in the source show up at the
//! target immediately and every run is safe to repeat.
//!
//! The public API is organised into layers:
//!
//! - **[`patterns`]**: which source entries are skipped
//! - **[`markers`]**: which directories are linked as a single unit
//! - **[`resources`]**: idempotent `check + apply` primitives for one target path
//! - **[`sync`]**: the top-down walk that ties them together into a [`result::SyncReport`]
//! - **[`commands`]**: the `link` and `version` subcommands
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod markers;
pub mod patterns;
pub mod resources;
pub mod result;
pub mod sync;

pub use error::{ConfigError, SyncError};
pub use result::{Outcome, SymlinkResult, SyncReport};
pub use sync::{SyncOptions, symlink_dotfiles, sync_profiles};
