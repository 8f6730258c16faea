// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for `fsevent`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fsevent",
    version,
    about = "Watch a path and log every filesystem event until interrupted.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to watch, relative to the current directory unless absolute.
    ///
    /// Optional for the parser so that a missing path is reported through
    /// the log stream like every other startup error.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
