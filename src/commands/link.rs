//! Command: link source profiles into the target directory.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, LinkOpts};
use crate::config::{FileConfig, Settings};
use crate::lock::TargetLock;
use crate::logging::{Log, Logger, ProfileEntry, ProfileStatus, cache_dir};
use crate::result::{Outcome, SymlinkResult, SyncReport};
use crate::sync;

/// Run the link command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, another run holds the
/// target lock, a source cannot be read, the run is cancelled, or any
/// conflict remains without `--force`.
pub fn run(global: &GlobalOpts, opts: &LinkOpts, log: &Logger) -> Result<()> {
    let file = FileConfig::load(global.config.as_deref())?;
    let mut settings = Settings::resolve(file, opts)?;
    let sources = sync::validate_sources(&settings.sources, &settings.target, &settings.options)?;
    let force = settings.options.force;
    let dry_run = settings.options.dry_run;

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(&cancel, log);
    settings.options.cancel = Some(Arc::clone(&cancel));

    let _lock = if dry_run {
        None
    } else {
        lock_target(&settings.target, log)?
    };
    let target_root = display_root(&settings.target);

    let mut total = SyncReport {
        dry_run,
        ..SyncReport::default()
    };
    for source in &sources {
        log.stage(&format!(
            "Linking {} -> {}",
            source.display(),
            settings.target.display()
        ));
        let report = sync::symlink_dotfiles(source, &settings.target, &settings.options)
            .with_context(|| format!("linking {}", source.display()))?;

        for result in &report.results {
            render(log, result, &target_root, dry_run);
        }
        let counts = report.counts();
        log.record_profile(ProfileEntry {
            source: source.clone(),
            status: ProfileStatus::from_run(&counts, dry_run, report.cancelled),
            counts,
        });

        total.extend(report);
        if total.cancelled {
            log.warn("interrupted; remaining entries and sources were not processed");
            break;
        }
    }

    if opts.json {
        let json = serde_json::to_string_pretty(&total.to_json(force))
            .context("serializing report")?;
        println!("{json}");
    } else {
        log.print_summary(dry_run);
    }

    if total.cancelled {
        anyhow::bail!("interrupted");
    }
    if total.failed(force) {
        let n = total.counts().conflicts;
        anyhow::bail!("{n} conflict(s); rerun with --force to replace them");
    }
    Ok(())
}

/// Set the cancellation flag on Ctrl-C.
fn install_interrupt_handler(cancel: &Arc<AtomicBool>, log: &dyn Log) {
    let flag = Arc::clone(cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        log.debug(&format!("cannot install Ctrl-C handler: {e}"));
    }
}

/// Create the target root if needed and take its run lock.
///
/// Without a cache directory the run proceeds unlocked.
fn lock_target(target: &Path, log: &dyn Log) -> Result<Option<TargetLock>> {
    // The lock name hashes the canonical path, which needs the directory to exist.
    if std::fs::symlink_metadata(target).is_err() {
        std::fs::create_dir_all(target)
            .with_context(|| format!("create target directory: {}", target.display()))?;
    }
    let Some(dir) = cache_dir() else {
        log.warn("no cache directory available; running without a lock");
        return Ok(None);
    };
    Ok(Some(TargetLock::acquire(&dir.join("locks"), target)?))
}

/// The target root as it appears in result paths.
fn display_root(target: &Path) -> PathBuf {
    dunce::canonicalize(target)
        .or_else(|_| std::path::absolute(target))
        .unwrap_or_else(|_| target.to_path_buf())
}

/// One human-readable line for `result`, with the target shown relative to
/// `target_root`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use symlink_dotfiles::commands::link::format_result;
/// use symlink_dotfiles::result::{Outcome, SymlinkResult};
///
/// let r = SymlinkResult::new("/dot/base/bashrc", "/home/u/.bashrc", Outcome::Created);
/// assert_eq!(format_result(&r, Path::new("/home/u"), false), "linked .bashrc");
/// assert_eq!(format_result(&r, Path::new("/home/u"), true), "would link .bashrc");
/// ```
#[must_use]
pub fn format_result(result: &SymlinkResult, target_root: &Path, dry_run: bool) -> String {
    let target = result
        .target
        .strip_prefix(target_root)
        .unwrap_or(&result.target)
        .display();
    let verb = match (result.outcome, dry_run) {
        (Outcome::Created, false) => "linked",
        (Outcome::Created, true) => "would link",
        (Outcome::Replaced, false) => "replaced",
        (Outcome::Replaced, true) => "would replace",
        (Outcome::AlreadyCorrect, _) => "ok",
        (Outcome::Conflict, _) => "conflict",
        (Outcome::Excluded, _) => "excluded",
        (Outcome::SkippedParentIsLink, _) => "skipped",
    };
    match &result.detail {
        Some(detail) if !matches!(result.outcome, Outcome::Created | Outcome::AlreadyCorrect) => {
            format!("{verb} {target} ({detail})")
        }
        _ => format!("{verb} {target}"),
    }
}

/// Changes and conflicts are always shown; everything else only with `-v`.
fn render(log: &dyn Log, result: &SymlinkResult, target_root: &Path, dry_run: bool) {
    let line = format_result(result, target_root, dry_run);
    match result.outcome {
        Outcome::Created | Outcome::Replaced if dry_run => log.dry_run(&line),
        Outcome::Created | Outcome::Replaced => log.info(&line),
        Outcome::Conflict => log.warn(&line),
        Outcome::AlreadyCorrect | Outcome::Excluded | Outcome::SkippedParentIsLink => {
            log.debug(&line);
        }
    }
}
