//! Cache-directory layout, ANSI stripping, and timestamps.
//!
//! Everything the tool persists lives under one cache directory:
//!
//! ```text
//! $XDG_CACHE_HOME/symlink-dotfiles/
//! ├── logs/<command>.log
//! └── locks/<sha256>.lock
//! ```
use std::fs;
use std::path::PathBuf;

/// `chrono` format of the run header.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// `chrono` format of per-line timestamps.
const TIME_FORMAT: &str = "%H:%M:%S";

/// Remove ANSI CSI sequences (`ESC [ params final`) from `s`.
///
/// A lone `ESC` not followed by `[` is dropped together with the next
/// character.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            // Parameter and intermediate bytes run until a final byte in `@..=~`.
            chars.by_ref().find(|c| ('@'..='~').contains(c));
        }
    }
    out
}

/// The tool's cache directory, created on demand.
///
/// Uses `$XDG_CACHE_HOME` when it is an absolute path, otherwise
/// `~/.cache`.  Returns `None` when neither is available or the directory
/// cannot be created.
pub(crate) fn cache_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .filter(|h| !h.is_empty())
                .map(|h| PathBuf::from(h).join(".cache"))
        })?;
    let dir = base.join("symlink-dotfiles");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Log file for `command`: `<cache>/logs/<command>.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = cache_dir()?.join("logs");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}

/// Current UTC date and time for the run header.
pub(super) fn format_utc_datetime() -> String {
    utc_now(DATETIME_FORMAT)
}

/// Current UTC time of day for log lines.
pub(super) fn format_utc_time() -> String {
    utc_now(TIME_FORMAT)
}
