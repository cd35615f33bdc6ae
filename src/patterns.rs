//! Exclude-pattern matching.
//!
//! Patterns are glob strings (`*`, `?`, `[...]`) compared against both the
//! basename and the source-root-relative path of an entry; a match on either
//! excludes it.  `*` never crosses a `/`, so `config/*.bak` only matches
//! directly inside `config/`.
use std::path::{Component, Path};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::ConfigError;

/// Built-in exclude patterns, applied before caller patterns.
///
/// Hidden entries (`.git`, `.DS_Store`, `.gitignore`, ...) are excluded because
/// sources use plain names and rely on the target prefix to add the dot.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[".*", "*~", "*.bak", "*.swp"];

/// Compile a single glob with separator-aware wildcards.
fn compile(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// The two strings a pattern is tested against.
struct Candidates {
    basename: Option<String>,
    relative: String,
}

impl Candidates {
    fn new(path: &Path) -> Self {
        let relative = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        let basename = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self { basename, relative }
    }

    fn matched_by(&self, matcher: &GlobMatcher) -> bool {
        self.basename.as_deref().is_some_and(|b| matcher.is_match(b))
            || (!self.relative.is_empty() && matcher.is_match(&self.relative))
    }
}

/// Return `true` if `path` (relative to the source root) matches any pattern.
///
/// Patterns are tried in order and the first match wins.  Patterns that are
/// not valid globs never match; use [`ExcludeSet::new`] to reject them up
/// front.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use symlink_dotfiles::patterns::{DEFAULT_EXCLUDE_PATTERNS, matches_exclude_pattern};
///
/// assert!(matches_exclude_pattern(Path::new(".DS_Store"), DEFAULT_EXCLUDE_PATTERNS));
/// assert!(matches_exclude_pattern(Path::new("config/nvim/init.lua.swp"), DEFAULT_EXCLUDE_PATTERNS));
/// assert!(!matches_exclude_pattern(Path::new("config/nvim/init.lua"), DEFAULT_EXCLUDE_PATTERNS));
/// ```
#[must_use]
pub fn matches_exclude_pattern<S: AsRef<str>>(path: &Path, patterns: &[S]) -> bool {
    let candidates = Candidates::new(path);
    patterns
        .iter()
        .any(|p| compile(p.as_ref()).is_ok_and(|m| candidates.matched_by(&m)))
}

/// An ordered, pre-compiled list of exclude patterns for one run.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<(String, GlobMatcher)>,
}

impl ExcludeSet {
    /// Compile `patterns` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for the first pattern that is
    /// not a valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.into();
                compile(&p)
                    .map(|m| (p.clone(), m))
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: p,
                        message: e.kind().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Build the run's list: [`DEFAULT_EXCLUDE_PATTERNS`] (unless
    /// `use_defaults` is `false`) followed by `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if any pattern is invalid.
    pub fn with_defaults<S: AsRef<str>>(extra: &[S], use_defaults: bool) -> Result<Self, ConfigError> {
        let defaults = DEFAULT_EXCLUDE_PATTERNS
            .iter()
            .filter(|_| use_defaults)
            .map(|p| (*p).to_string());
        Self::new(defaults.chain(extra.iter().map(|p| p.as_ref().to_string())))
    }

    /// The first pattern matching `path`, if any.
    #[must_use]
    pub fn first_match(&self, path: &Path) -> Option<&str> {
        let candidates = Candidates::new(path);
        self.patterns
            .iter()
            .find(|(_, m)| candidates.matched_by(m))
            .map(|(p, _)| p.as_str())
    }

    /// Whether any pattern matches `path`.
    #[must_use]
    pub fn is_match(&self, path: &Path) -> bool {
        self.first_match(path).is_some()
    }

    /// Pattern strings in evaluation order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(p, _)| p.as_str())
    }

    /// Reject a set that would exclude the source root itself.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RootExcluded`] naming the offending pattern.
    pub fn check_root(&self, root: &Path) -> Result<(), ConfigError> {
        let Some(name) = root.file_name() else {
            return Ok(());
        };
        match self.first_match(Path::new(name)) {
            Some(pattern) => Err(ConfigError::RootExcluded {
                pattern: pattern.to_string(),
                root: root.to_path_buf(),
            }),
            None => Ok(()),
        }
    }
}
