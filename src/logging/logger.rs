//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, ProfileEntry, ProfileStatus};
use super::utils::log_file_path;
use crate::result::Counts;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_profile` method is **not** included because its signature
/// differs from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are also written to `logs/<command>.log` in the cache
/// directory, timestamped and without ANSI codes, whatever the console mode.
#[derive(Debug)]
pub struct Logger {
    profiles: Mutex<Vec<ProfileEntry>>,
    log_file: Option<PathBuf>,
    start: Instant,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary.  The log file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber);
    /// this constructor does not write to it.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            profiles: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
            start: Instant::now(),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded profile entries (test-only).
    #[cfg(test)]
    pub(crate) fn profile_entries(&self) -> Vec<ProfileEntry> {
        self.profiles.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a profile result for the summary.
    pub fn record_profile(&self, entry: ProfileEntry) {
        if let Ok(mut guard) = self.profiles.lock() {
            guard.push(entry);
        }
    }

    /// Counts summed over every recorded profile.
    #[must_use]
    pub fn totals(&self) -> Counts {
        self.profiles.lock().map_or_else(
            |_| Counts::default(),
            |guard| {
                guard.iter().fold(Counts::default(), |mut acc, p| {
                    acc += p.counts;
                    acc
                })
            },
        )
    }

    /// Print the summary of all recorded profiles.
    pub fn print_summary(&self, dry_run: bool) {
        let profiles = match self.profiles.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if profiles.is_empty() {
            return;
        }

        self.stage("Summary");

        for profile in &profiles {
            let (icon, color) = match profile.status {
                ProfileStatus::Ok => ("✓", "\x1b[32m"),
                ProfileStatus::DryRun => ("~", "\x1b[37m"),
                ProfileStatus::Conflicts => ("✗", "\x1b[31m"),
                ProfileStatus::Cancelled => ("○", "\x1b[33m"),
            };
            self.info(&format!(
                "{color}{icon} {}\x1b[0m ({})",
                profile.source.display(),
                profile.counts.summary(dry_run)
            ));
        }

        if profiles.len() > 1 {
            self.info(&format!("total: {}", self.totals().summary(dry_run)));
        }
        self.debug(&format!("finished in {:.2?}", self.start.elapsed()));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_profile(&self, entry: ProfileEntry) {
        self.record_profile(entry);
    }
}
