//! Top-level subcommand orchestration.
pub mod link;
pub mod version;
