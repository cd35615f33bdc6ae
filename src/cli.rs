//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "symlink-dotfiles",
    about = "Mirror dotfile profile directories into a target tree with symlinks",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Configuration file (default: $XDG_CONFIG_HOME/symlink-dotfiles/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link source profile directories into the target directory
    Link(LinkOpts),
    /// Print version information
    Version,
}

/// Options for the `link` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct LinkOpts {
    /// Source profile directory (repeatable; processed in order)
    #[arg(short, long = "source", value_name = "DIR")]
    pub sources: Vec<PathBuf>,

    /// Target directory (default: home directory)
    #[arg(short, long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Prefix added to the first path component at the target (e.g. ".")
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Top-level source directory to skip (repeatable)
    #[arg(short = 'e', long = "exclude", value_name = "NAME")]
    pub exclude_dirs: Vec<String>,

    /// Marker file that links its directory as a single symlink
    #[arg(short, long, value_name = "NAME")]
    pub marker: Option<String>,

    /// Glob of source entries to skip (repeatable; added to the defaults)
    #[arg(short = 'x', long = "exclude-pattern", value_name = "GLOB")]
    pub exclude_patterns: Vec<String>,

    /// Source subdirectory always linked as a single symlink (repeatable)
    #[arg(long = "profile-root", value_name = "DIR")]
    pub profile_roots: Vec<PathBuf>,

    /// Do not apply the built-in exclude patterns
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Replace conflicting links, regular files and empty directories
    #[arg(short, long)]
    pub force: bool,

    /// Preview changes without applying
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print a machine-readable JSON report on stdout
    #[arg(short, long)]
    pub json: bool,

    /// Walk directories sequentially (parallel is enabled by default)
    #[arg(long = "no-parallel", action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}
