//! File-system helpers shared by the link and directory resources.
use anyhow::{Context as _, Result};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Suffix appended to a regular file moved aside by a forced replace.
pub const BACKUP_SUFFIX: &str = "symlink-dotfiles.bak";

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) as real directories if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Return the nearest existing ancestor of `path` if it is a symlink.
///
/// Walks upward from the parent of `path`, skipping ancestors that do not
/// exist yet, and stops at the first one that does.  Only that ancestor is
/// inspected, so links above an existing real directory are not reported.
///
/// # Errors
///
/// Returns an error if an ancestor's metadata cannot be read for a reason
/// other than it being absent.
pub fn nearest_link_ancestor(path: &Path) -> Result<Option<PathBuf>> {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        match std::fs::symlink_metadata(ancestor) {
            Ok(meta) if meta.is_symlink() => return Ok(Some(ancestor.to_path_buf())),
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("reading metadata: {}", ancestor.display()));
            }
        }
    }
    Ok(None)
}

/// Sibling path used to keep a regular file aside during a forced replace.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(".");
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Resolve `.` and `..` without touching the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Compare two paths, normalising the `\\?\` prefix that Windows
/// `read_link` prepends to extended-length paths.
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    strip_win_prefix(a) == strip_win_prefix(b)
}

fn strip_win_prefix(p: &Path) -> PathBuf {
    let s = p.to_string_lossy();
    s.strip_prefix(r"\\?\")
        .map_or_else(|| normalize_lexically(p), |rest| normalize_lexically(Path::new(rest)))
}

/// Create a symlink at `link` pointing to `target`.
///
/// On Windows a directory link that cannot be created as a symlink falls
/// back to a junction.
///
/// # Errors
///
/// Returns an error if the link cannot be created.
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            if std::os::windows::fs::symlink_dir(target, link).is_err() {
                create_junction(target, link)?;
            }
        } else {
            std::os::windows::fs::symlink_file(target, link).with_context(|| {
                format!(
                    "creating symlink {} -> {} (enable Developer Mode or run as Administrator)",
                    link.display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
}

/// Fallback for Windows when directory symlinks are not permitted.
#[cfg(windows)]
fn create_junction(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    let output = std::process::Command::new("cmd")
        .arg("/c")
        .arg("mklink")
        .arg("/J")
        .arg(link)
        .arg(target)
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .context("failed to run mklink /J")?;
    if !output.status.success() {
        anyhow::bail!(
            "cannot create symlink or junction for '{}': {}",
            link.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// Remove a symlink, handling platform differences.
///
/// On Windows, directory symlinks and junctions must be removed with
/// `remove_dir`; `symlink_metadata().is_dir()` is `false` for them, so the
/// raw `FILE_ATTRIBUTE_DIRECTORY` flag is checked instead.
///
/// # Errors
///
/// Returns an error if the path is not a symlink or cannot be removed.
pub fn remove_symlink(path: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if !meta.is_symlink() && !is_junction(&meta) {
        anyhow::bail!("refusing to remove non-symlink: {}", path.display());
    }
    if is_dir_like(&meta) {
        std::fs::remove_dir(path)
            .with_context(|| format!("removing directory link: {}", path.display()))?;
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing link: {}", path.display()))?;
    }
    Ok(())
}

/// Check if metadata represents a directory-like entry.
fn is_dir_like(meta: &std::fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes() & 0x10 != 0 // FILE_ATTRIBUTE_DIRECTORY
    }
    #[cfg(not(windows))]
    {
        meta.is_dir()
    }
}

/// Junctions report as reparse points rather than symlinks on Windows.
fn is_junction(meta: &std::fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes() & 0x400 != 0 // FILE_ATTRIBUTE_REPARSE_POINT
    }
    #[cfg(not(windows))]
    {
        let _ = meta;
        false
    }
}
