//! Command: print version information.

/// Version string injected by `build.rs`, or `dev-<crate version>`.
#[must_use]
pub fn version() -> &'static str {
    option_env!("SYMLINK_DOTFILES_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")))
}

/// Print the version to stdout.
pub fn run() {
    println!("symlink-dotfiles {}", version());
}
