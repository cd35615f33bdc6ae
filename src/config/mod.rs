//! Optional configuration file and its merge with command-line options.
//!
//! The file lives at `--config FILE` or
//! `$XDG_CONFIG_HOME/symlink-dotfiles/config.toml` (falling back to
//! `~/.config/...`).  A missing file is not an error.  Command-line flags
//! override scalar values and extend list values.
pub mod toml_loader;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::LinkOpts;
use crate::error::ConfigError;
use crate::markers::DEFAULT_DIRECTORY_MARKER;
use crate::sync::SyncOptions;

/// Contents of `config.toml`.
///
/// ```toml
/// sources = ["~/dotfiles/base", "~/dotfiles/work"]
/// target = "~"
/// prefix = "."
/// exclude_patterns = ["*.log"]
/// exclude_dirs = ["scripts"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Source profile directories, in order.
    pub sources: Vec<PathBuf>,
    /// Target directory.
    pub target: Option<PathBuf>,
    /// Prefix for the first target path component.
    pub prefix: Option<String>,
    /// Marker file name.
    pub marker: Option<String>,
    /// Extra exclude globs.
    pub exclude_patterns: Vec<String>,
    /// Top-level source directories to skip.
    pub exclude_dirs: Vec<String>,
    /// Source subdirectories always linked atomically.
    pub profile_roots: Vec<PathBuf>,
    /// Whether built-in excludes apply.
    pub default_excludes: Option<bool>,
    /// Replace conflicting targets.
    pub force: Option<bool>,
    /// Walk directories in parallel.
    pub parallel: Option<bool>,
}

impl FileConfig {
    /// Load the file at `path`, or the default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
            return Ok(Self::default());
        };
        let config: Self = toml_loader::load_config(&path)?;
        tracing::debug!("loaded config {}", path.display());
        Ok(config.expand_home())
    }

    fn expand_home(mut self) -> Self {
        self.sources = self.sources.iter().map(PathBuf::as_path).map(expand_tilde).collect();
        self.target = self.target.as_deref().map(expand_tilde);
        self
    }
}

/// Everything a `link` run needs after merging file and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Source profile directories, in order.
    pub sources: Vec<PathBuf>,
    /// Target directory.
    pub target: PathBuf,
    /// Engine options shared by every source.
    pub options: SyncOptions,
}

impl Settings {
    /// Merge `file` with command-line `opts`.
    ///
    /// Command-line sources replace the file's sources; other lists are
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSources`] if neither side names a source and
    /// [`ConfigError::NoTarget`] if no target is given and no home directory
    /// is known.
    pub fn resolve(file: FileConfig, opts: &LinkOpts) -> Result<Self, ConfigError> {
        let sources = if opts.sources.is_empty() {
            file.sources
        } else {
            opts.sources.clone()
        };
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let target = opts
            .target
            .clone()
            .or(file.target)
            .or_else(home_dir)
            .ok_or(ConfigError::NoTarget)?;

        let options = SyncOptions {
            exclude_patterns: concat(file.exclude_patterns, &opts.exclude_patterns),
            default_excludes: !opts.no_default_excludes && file.default_excludes.unwrap_or(true),
            marker_name: opts
                .marker
                .clone()
                .or(file.marker)
                .unwrap_or_else(|| DEFAULT_DIRECTORY_MARKER.to_string()),
            force: opts.force || file.force.unwrap_or(false),
            prefix: opts.prefix.clone().or(file.prefix).unwrap_or_default(),
            exclude_dirs: concat(file.exclude_dirs, &opts.exclude_dirs),
            profile_roots: concat(file.profile_roots, &opts.profile_roots),
            dry_run: opts.dry_run,
            parallel: opts.parallel && file.parallel.unwrap_or(true),
            cancel: None,
            skip_missing_sources: true,
        };
        Ok(Self {
            sources,
            target,
            options,
        })
    }
}

fn concat<T: Clone>(mut base: Vec<T>, extra: &[T]) -> Vec<T> {
    base.extend_from_slice(extra);
    base
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|h| h.join(".config")))?;
    Some(base.join("symlink-dotfiles").join("config.toml"))
}

/// Replace a leading `~` component with the home directory.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn opts() -> LinkOpts {
        LinkOpts {
            parallel: true,
            ..LinkOpts::default()
        }
    }

    fn file_with_sources() -> FileConfig {
        FileConfig {
            sources: vec![PathBuf::from("/dot/base")],
            target: Some(PathBuf::from("/home/user")),
            ..FileConfig::default()
        }
    }

    #[test]
    fn parses_all_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
sources = ["/dot/base", "/dot/work"]
target = "/home/user"
prefix = "."
marker = ".atomic"
exclude_patterns = ["*.log"]
exclude_dirs = ["scripts"]
profile_roots = ["config/nvim"]
default_excludes = false
force = true
parallel = false
"#,
        )
        .unwrap();
        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.prefix.as_deref(), Some("."));
        assert_eq!(config.marker.as_deref(), Some(".atomic"));
        assert_eq!(config.default_excludes, Some(false));
        assert_eq!(config.force, Some(true));
        assert_eq!(config.parallel, Some(false));
    }

    #[test]
    fn missing_explicit_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FileConfig::load(Some(&tmp.path().join("none.toml"))).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "sorces = []\n").unwrap();
        assert!(matches!(
            FileConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn cli_sources_replace_file_sources() {
        let mut cli = opts();
        cli.sources = vec![PathBuf::from("/dot/other")];
        let settings = Settings::resolve(file_with_sources(), &cli).unwrap();
        assert_eq!(settings.sources, vec![PathBuf::from("/dot/other")]);
        assert_eq!(settings.target, PathBuf::from("/home/user"));
    }

    #[test]
    fn cli_scalars_override_and_lists_extend() {
        let file = FileConfig {
            prefix: Some(String::new()),
            exclude_patterns: vec!["*.log".to_string()],
            force: Some(false),
            ..file_with_sources()
        };
        let mut cli = opts();
        cli.prefix = Some(".".to_string());
        cli.exclude_patterns = vec!["*.tmp".to_string()];
        cli.force = true;
        let settings = Settings::resolve(file, &cli).unwrap();
        assert_eq!(settings.options.prefix, ".");
        assert_eq!(settings.options.exclude_patterns, vec!["*.log", "*.tmp"]);
        assert!(settings.options.force);
    }

    #[test]
    fn defaults_without_file_values() {
        let settings = Settings::resolve(file_with_sources(), &opts()).unwrap();
        assert!(settings.options.default_excludes);
        assert!(settings.options.parallel);
        assert_eq!(settings.options.marker_name, DEFAULT_DIRECTORY_MARKER);
        assert!(settings.options.prefix.is_empty());
    }

    #[test]
    fn no_sources_anywhere_is_error() {
        let err = Settings::resolve(FileConfig::default(), &opts()).unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn file_can_disable_parallel_and_defaults() {
        let file = FileConfig {
            parallel: Some(false),
            default_excludes: Some(false),
            ..file_with_sources()
        };
        let settings = Settings::resolve(file, &opts()).unwrap();
        assert!(!settings.options.parallel);
        assert!(!settings.options.default_excludes);
    }

    #[test]
    fn tilde_only_expands_leading_component() {
        let path = PathBuf::from("/abs/~/x");
        assert_eq!(expand_tilde(&path), path);
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde(Path::new("~/dotfiles")), home.join("dotfiles"));
        }
    }
}
