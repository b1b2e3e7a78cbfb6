use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::commands::run::RunArgs;

/// dataforge-run: run the DataForge tool against a file
///
/// Streams the tool's output to the terminal with live progress and exits
/// with the tool's own exit code.
#[derive(Parser, Debug)]
#[command(name = "dataforge-run", version, about, long_about = None)]
pub struct Cli {
    /// Increase output verbosity (show info-level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress the spinner and the final summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a daily-rotated file in this directory instead of stderr
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Verbosity level resolved from --verbose / --quiet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Cli {
    /// Resolve the verbosity level from CLI flags
    pub fn verbosity(&self) -> Verbosity {
        match (self.quiet, self.verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tool against a file
    Run(RunArgs),

    /// Generate shell completion scripts
    Completion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
