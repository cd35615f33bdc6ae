#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the synchronization engine.
//!
//! Each test lays out a source profile in a temporary directory, runs
//! [`symlink_dotfiles`] or [`sync_profiles`] against an isolated target root
//! and checks both the reported outcomes and the resulting filesystem.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use common::*;
use symlink_dotfiles::commands::link::format_result;
use symlink_dotfiles::error::{ConfigError, SyncError};
use symlink_dotfiles::markers::{find_marker_directories, is_inside_marker_dir};
use symlink_dotfiles::resources::fs::backup_path;
use symlink_dotfiles::result::Outcome;
use symlink_dotfiles::sync::{SyncOptions, symlink_dotfiles, sync_profiles};

fn scenario_a() -> SyncContext {
    SourceTree::new()
        .file_with("gitconfig", "[user]\n")
        .marker_dir("config/nvim")
        .marker_dir("config/fish")
        .build()
}

fn run(ctx: &SyncContext, opts: &SyncOptions) -> symlink_dotfiles::SyncReport {
    symlink_dotfiles(&ctx.source, &ctx.target, opts).expect("sync should succeed")
}

fn owned(pairs: &[(&str, Outcome)]) -> Vec<(String, Outcome)> {
    pairs.iter().map(|(p, o)| ((*p).to_string(), *o)).collect()
}

/// Every regular file below `dir`, depth first.
fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                stack.push(entry.path());
            } else {
                out.push(entry.path());
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Core scenarios
// ---------------------------------------------------------------------------

#[test]
fn fresh_target_links_files_and_marker_directories() {
    let ctx = scenario_a();
    let report = run(&ctx, &SyncOptions::default());

    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            ("config/fish", Outcome::Created),
            ("config/nvim", Outcome::Created),
            ("gitconfig", Outcome::Created),
        ])
    );
    assert!(links_to(&ctx.target_path("gitconfig"), &ctx.source_path("gitconfig")));
    assert!(links_to(&ctx.target_path("config/nvim"), &ctx.source_path("config/nvim")));
    assert!(links_to(&ctx.target_path("config/fish"), &ctx.source_path("config/fish")));
    let gitconfig = report
        .results
        .iter()
        .find(|r| r.source == ctx.source_path("gitconfig"))
        .unwrap();
    assert_eq!(
        gitconfig.target.as_os_str(),
        ctx.target_path("gitconfig").as_os_str(),
        "root-level targets carry no trailing separator"
    );

    let config = std::fs::symlink_metadata(ctx.target_path("config")).unwrap();
    assert!(config.is_dir(), "config/ must be a real directory");
    assert!(!config.file_type().is_symlink());
    assert!(report.changed());
    assert!(!report.failed(false));
}

#[test]
fn second_run_is_already_correct() {
    let ctx = scenario_a();
    run(&ctx, &SyncOptions::default());
    let before = std::fs::read_link(ctx.target_path("gitconfig")).unwrap();

    let report = run(&ctx, &SyncOptions::default());
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            ("config/fish", Outcome::AlreadyCorrect),
            ("config/nvim", Outcome::AlreadyCorrect),
            ("gitconfig", Outcome::AlreadyCorrect),
        ])
    );
    assert!(!report.changed());
    assert_eq!(std::fs::read_link(ctx.target_path("gitconfig")).unwrap(), before);
}

#[test]
fn existing_file_is_a_conflict_without_force() {
    let ctx = SourceTree::new()
        .file("gitconfig")
        .marker_dir("config/nvim")
        .marker_dir("config/fish")
        .target_file("gitconfig", "user content")
        .build();

    let report = run(&ctx, &SyncOptions::default());
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            ("config/fish", Outcome::Created),
            ("config/nvim", Outcome::Created),
            ("gitconfig", Outcome::Conflict),
        ])
    );
    assert!(report.failed(false));
    let conflict = report.conflicts().next().unwrap();
    assert_eq!(conflict.detail.as_deref(), Some("target is a regular file"));
    assert_eq!(
        std::fs::read_to_string(ctx.target_path("gitconfig")).unwrap(),
        "user content"
    );
}

#[test]
fn force_replaces_file_and_keeps_a_backup() {
    let ctx = SourceTree::new()
        .file("gitconfig")
        .target_file("gitconfig", "user content")
        .build();
    let opts = SyncOptions {
        force: true,
        ..SyncOptions::default()
    };

    let report = run(&ctx, &opts);
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[("gitconfig", Outcome::Replaced)])
    );
    assert!(!report.failed(true));
    assert!(links_to(&ctx.target_path("gitconfig"), &ctx.source_path("gitconfig")));
    let backup = backup_path(&ctx.target_path("gitconfig"));
    assert_eq!(std::fs::read_to_string(backup).unwrap(), "user content");
}

#[test]
fn wrong_link_is_replaced_only_with_force() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let elsewhere = ctx.root_path().join("elsewhere");
    std::fs::write(&elsewhere, "").unwrap();
    symlink_dotfiles::resources::fs::create_symlink(&elsewhere, &ctx.target_path("gitconfig"))
        .unwrap();

    let report = run(&ctx, &SyncOptions::default());
    let result = &report.results[0];
    assert_eq!(result.outcome, Outcome::Conflict);
    assert!(result.detail.as_deref().unwrap().starts_with("points to"));

    let forced = SyncOptions {
        force: true,
        ..SyncOptions::default()
    };
    let report = run(&ctx, &forced);
    assert_eq!(report.results[0].outcome, Outcome::Replaced);
    assert!(links_to(&ctx.target_path("gitconfig"), &ctx.source_path("gitconfig")));
}

#[test]
fn non_empty_directory_is_never_replaced() {
    let ctx = SourceTree::new()
        .file("vimrc")
        .target_file("vimrc/keep", "data")
        .build();
    let opts = SyncOptions {
        force: true,
        ..SyncOptions::default()
    };

    let report = run(&ctx, &opts);
    assert_eq!(report.results[0].outcome, Outcome::Conflict);
    assert!(ctx.target_path("vimrc/keep").is_file());
    assert!(report.failed(false));
}

#[test]
fn link_below_symlinked_target_directory_is_skipped() {
    let ctx = SourceTree::new().file("config/fish/config.fish").build();
    let real = ctx.root_path().join("real-config");
    std::fs::create_dir(&real).unwrap();
    symlink_dotfiles::resources::fs::create_symlink(&real, &ctx.target_path("config")).unwrap();

    let report = run(&ctx, &SyncOptions::default());
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[("config", Outcome::SkippedParentIsLink)])
    );
    assert!(
        std::fs::read_dir(&real).unwrap().next().is_none(),
        "nothing may be written through the symlink"
    );
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn every_source_file_is_accounted_for() {
    let ctx = SourceTree::new()
        .file("bashrc")
        .file("notes.bak")
        .file("config/git/config")
        .file("config/git/ignore~")
        .marker_dir("config/nvim")
        .file("config/nvim/lua/plugins.lua")
        .file("local/bin/tool")
        .build();
    let report = run(&ctx, &SyncOptions::default());
    let markers = find_marker_directories(&ctx.source, ".symlink-as-directory");

    for file in files_under(&ctx.source) {
        let covered = is_inside_marker_dir(&file, &markers)
            || report
                .results
                .iter()
                .any(|r| file.ancestors().any(|a| a == r.source));
        assert!(covered, "{} has no result", file.display());
    }
}

#[test]
fn nothing_inside_a_marker_directory_is_reported() {
    let ctx = SourceTree::new()
        .marker_dir("config/nvim")
        .file("config/nvim/lua/plugins.lua")
        .marker_dir("config/nvim/pack")
        .build();
    let report = run(&ctx, &SyncOptions::default());
    let nvim = ctx.source_path("config/nvim");

    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[("config/nvim", Outcome::Created)])
    );
    assert!(
        report
            .results
            .iter()
            .all(|r| r.source == nvim || !r.source.starts_with(&nvim))
    );
    assert!(links_to(&ctx.target_path("config/nvim"), &nvim));
}

#[test]
fn profile_root_is_linked_atomically_without_marker() {
    let ctx = SourceTree::new()
        .file("config/emacs/init.el")
        .file("config/emacs/early-init.el")
        .build();
    let opts = SyncOptions {
        profile_roots: vec![PathBuf::from("config/emacs")],
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[("config/emacs", Outcome::Created)])
    );
}

#[test]
fn parallel_walk_matches_sequential_walk() {
    let mut tree = SourceTree::new().marker_dir("config/nvim");
    for dir in ["a", "b", "c/d", "c/e"] {
        for file in ["one", "two", "three.swp"] {
            tree = tree.file(&format!("{dir}/{file}"));
        }
    }
    let ctx = tree.target_file("b/two", "occupied").build();

    let dry = |parallel| SyncOptions {
        dry_run: true,
        parallel,
        ..SyncOptions::default()
    };
    let sequential = run(&ctx, &dry(false));
    let parallel = run(&ctx, &dry(true));
    assert_eq!(sequential, parallel);

    let applied = run(
        &ctx,
        &SyncOptions {
            parallel: true,
            ..SyncOptions::default()
        },
    );
    let expected: Vec<_> = sequential
        .results
        .iter()
        .map(|r| (r.target.clone(), r.outcome))
        .collect();
    let actual: Vec<_> = applied
        .results
        .iter()
        .map(|r| (r.target.clone(), r.outcome))
        .collect();
    assert_eq!(expected, actual);
}

// ---------------------------------------------------------------------------
// Exclusion
// ---------------------------------------------------------------------------

#[test]
fn exclusion_reasons_follow_precedence() {
    let ctx = SourceTree::new()
        .file("scripts/install.sh")
        .file("bashrc")
        .file("bashrc.swp")
        .file(".symlink-as-directory")
        .build();
    let opts = SyncOptions {
        exclude_dirs: vec!["scripts".to_string()],
        exclude_patterns: vec!["script*".to_string()],
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);
    let detail = |rel: &str| {
        report
            .results
            .iter()
            .find(|r| r.source == ctx.source_path(rel))
            .and_then(|r| r.detail.clone())
            .unwrap()
    };

    assert_eq!(detail("scripts"), "excluded directory");
    assert_eq!(detail("bashrc.swp"), "matches '*.swp'");
    assert_eq!(detail(".symlink-as-directory"), "matches '.*'");
    assert!(!ctx.target_path("scripts").exists());
    assert!(links_to(&ctx.target_path("bashrc"), &ctx.source_path("bashrc")));
}

#[test]
fn root_marker_file_is_excluded_without_defaults() {
    let ctx = SourceTree::new()
        .file(".symlink-as-directory")
        .file(".profile")
        .build();
    let opts = SyncOptions {
        default_excludes: false,
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);

    let marker = report
        .results
        .iter()
        .find(|r| r.source == ctx.source_path(".symlink-as-directory"))
        .unwrap();
    assert_eq!(marker.outcome, Outcome::Excluded);
    assert_eq!(marker.detail.as_deref(), Some("marker file"));
    assert!(links_to(&ctx.target_path(".profile"), &ctx.source_path(".profile")));
}

#[test]
fn exclude_dirs_only_match_top_level() {
    let ctx = SourceTree::new()
        .file("scripts/setup")
        .file("config/scripts/helper")
        .build();
    let opts = SyncOptions {
        exclude_dirs: vec!["scripts".to_string()],
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            ("config/scripts/helper", Outcome::Created),
            ("scripts", Outcome::Excluded),
        ])
    );
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn prefix_applies_to_first_component() {
    let ctx = scenario_a();
    let opts = SyncOptions {
        prefix: ".".to_string(),
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            (".config/fish", Outcome::Created),
            (".config/nvim", Outcome::Created),
            (".gitconfig", Outcome::Created),
        ])
    );
    assert!(links_to(&ctx.target_path(".gitconfig"), &ctx.source_path("gitconfig")));
}

#[test]
fn dry_run_reports_without_touching_the_target() {
    let ctx = SourceTree::new()
        .file("gitconfig")
        .marker_dir("config/nvim")
        .target_file("bashrc", "mine")
        .file("bashrc")
        .build();
    let opts = SyncOptions {
        dry_run: true,
        force: true,
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);

    assert!(report.dry_run);
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            ("bashrc", Outcome::Replaced),
            ("config/nvim", Outcome::Created),
            ("gitconfig", Outcome::Created),
        ])
    );
    assert!(!ctx.target_path("config").exists());
    assert!(!ctx.target_path("gitconfig").exists());
    assert_eq!(std::fs::read_to_string(ctx.target_path("bashrc")).unwrap(), "mine");
}

#[test]
fn dry_run_does_not_create_target_root() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let target = ctx.root_path().join("new-home");
    let opts = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };
    let report = symlink_dotfiles(&ctx.source, &target, &opts).unwrap();
    assert_eq!(report.results[0].outcome, Outcome::Created);
    assert!(!target.exists());
}

#[test]
fn cancelled_run_reports_partial_results() {
    let ctx = scenario_a();
    let opts = SyncOptions {
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..SyncOptions::default()
    };
    let report = run(&ctx, &opts);
    assert!(report.cancelled);
    assert!(report.results.is_empty());
    assert!(!ctx.target_path("gitconfig").exists());
}

// ---------------------------------------------------------------------------
// Multiple profiles
// ---------------------------------------------------------------------------

#[test]
fn profiles_are_applied_in_order() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let work = ctx.profile("work");
    std::fs::write(work.join("gitconfig"), "").unwrap();
    std::fs::write(work.join("ssh_config"), "").unwrap();
    let missing = ctx.profile("work").with_file_name("absent");

    let opts = SyncOptions {
        skip_missing_sources: true,
        ..SyncOptions::default()
    };
    let report = sync_profiles(&[ctx.source.clone(), missing, work.clone()], &ctx.target, &opts)
        .unwrap();

    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[
            ("gitconfig", Outcome::Created),
            ("gitconfig", Outcome::Conflict),
            ("ssh_config", Outcome::Created),
        ])
    );
    assert!(links_to(&ctx.target_path("gitconfig"), &ctx.source_path("gitconfig")));
    assert!(links_to(&ctx.target_path("ssh_config"), &work.join("ssh_config")));
}

#[test]
fn missing_profile_is_an_error_by_default() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let missing = ctx.root_path().join("absent");
    let err = sync_profiles(
        &[ctx.source.clone(), missing],
        &ctx.target,
        &SyncOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SyncError::Config(ConfigError::SourceMissing(_))));
    assert!(
        !ctx.target_path("gitconfig").exists(),
        "sources are validated before any is applied"
    );
}

#[test]
fn absolute_profile_root_applies_only_to_its_source() {
    let ctx = SourceTree::new()
        .file("nvim/init.lua")
        .file("nvim/lua/plugins.lua")
        .build();
    let work = ctx.profile("work");
    std::fs::write(work.join("ssh_config"), "").unwrap();
    let opts = SyncOptions {
        profile_roots: vec![ctx.source_path("nvim")],
        ..SyncOptions::default()
    };

    let report = sync_profiles(&[ctx.source.clone(), work.clone()], &ctx.target, &opts).unwrap();
    assert_eq!(
        outcomes(&report, &ctx.target),
        owned(&[("nvim", Outcome::Created), ("ssh_config", Outcome::Created)])
    );
    assert!(links_to(&ctx.target_path("nvim"), &ctx.source_path("nvim")));
}

#[test]
fn profile_root_outside_every_source_fails_before_linking() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let elsewhere = ctx.profile("elsewhere");
    let opts = SyncOptions {
        profile_roots: vec![elsewhere],
        ..SyncOptions::default()
    };
    let err = sync_profiles(&[ctx.source.clone()], &ctx.target, &opts).unwrap_err();
    assert!(matches!(
        err,
        SyncError::Config(ConfigError::ProfileOutsideSource { .. })
    ));
    assert!(!ctx.target_path("gitconfig").exists());
}

#[test]
fn invalid_later_source_fails_before_earlier_ones_are_linked() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let hidden = ctx.profile(".work");
    std::fs::write(hidden.join("ssh_config"), "").unwrap();

    let err = sync_profiles(&[ctx.source.clone(), hidden], &ctx.target, &SyncOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Config(ConfigError::RootExcluded { .. })
    ));
    assert!(
        std::fs::symlink_metadata(ctx.target_path("gitconfig")).is_err(),
        "no source may be linked when any source is invalid"
    );
}

// ---------------------------------------------------------------------------
// Invalid input
// ---------------------------------------------------------------------------

#[test]
fn hidden_source_root_is_rejected_by_default_excludes() {
    let ctx = SyncContext::new();
    let hidden = ctx.profile(".dotfiles");
    let err = symlink_dotfiles(&hidden, &ctx.target, &SyncOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        SyncError::Config(ConfigError::RootExcluded { .. })
    ));

    let opts = SyncOptions {
        default_excludes: false,
        ..SyncOptions::default()
    };
    assert!(symlink_dotfiles(&hidden, &ctx.target, &opts).is_ok());
}

#[test]
fn invalid_inputs_touch_nothing() {
    let ctx = SourceTree::new().file("gitconfig").build();
    let bad_pattern = SyncOptions {
        exclude_patterns: vec!["[".to_string()],
        ..SyncOptions::default()
    };
    assert!(matches!(
        symlink_dotfiles(&ctx.source, &ctx.target, &bad_pattern),
        Err(SyncError::Config(ConfigError::InvalidPattern { .. }))
    ));

    let bad_marker = SyncOptions {
        marker_name: "a/b".to_string(),
        ..SyncOptions::default()
    };
    assert!(matches!(
        symlink_dotfiles(&ctx.source, &ctx.target, &bad_marker),
        Err(SyncError::Config(ConfigError::InvalidMarkerName(_)))
    ));

    let file_source = ctx.source_path("gitconfig");
    assert!(matches!(
        symlink_dotfiles(&file_source, &ctx.target, &SyncOptions::default()),
        Err(SyncError::Config(ConfigError::SourceNotDirectory(_)))
    ));
    assert!(std::fs::read_dir(&ctx.target).unwrap().next().is_none());
}

// ---------------------------------------------------------------------------
// Snapshot: human-readable report
// ---------------------------------------------------------------------------

#[test]
fn report_lines_for_fresh_target() {
    let ctx = scenario_a();
    let report = run(&ctx, &SyncOptions::default());
    let mut lines: Vec<String> = report
        .results
        .iter()
        .map(|r| format_result(r, &ctx.target, false))
        .collect();
    lines.push(report.counts().summary(false));
    insta::assert_snapshot!(lines.join("\n"), @r"
    linked config/fish
    linked config/nvim
    linked gitconfig
    3 created, 0 replaced, 0 already ok, 0 conflicts, 0 excluded, 0 skipped
    ");
}
