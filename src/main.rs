//! `symlink-dotfiles` command-line entry point.
use anyhow::Result;
use clap::Parser;

use symlink_dotfiles::cli::{self, Command};
use symlink_dotfiles::commands;
use symlink_dotfiles::logging::{self, ConsoleMode, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match args.command {
        Command::Link(opts) => {
            let mode = if opts.json {
                ConsoleMode::Quiet
            } else if args.verbose {
                ConsoleMode::Verbose
            } else {
                ConsoleMode::Normal
            };
            logging::init_subscriber(mode, "link");
            let log = Logger::new("link");
            commands::link::run(&args.global, &opts, &log)
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
