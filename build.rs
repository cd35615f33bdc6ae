//! Build script: embeds the release or git-describe version string.

use std::process::Command;

fn main() {
    // An explicit SYMLINK_DOTFILES_VERSION (release builds) wins over git describe.
    if let Ok(version) = std::env::var("SYMLINK_DOTFILES_VERSION") {
        println!("cargo:rustc-env=SYMLINK_DOTFILES_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !version.is_empty() {
            println!("cargo:rustc-env=SYMLINK_DOTFILES_VERSION={version}");
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=SYMLINK_DOTFILES_VERSION");
}
