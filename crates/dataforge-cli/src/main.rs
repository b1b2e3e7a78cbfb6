mod cli;
mod commands;
mod logging;
mod render;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    // `completion` needs no logging or config, so handle it early
    if let Commands::Completion(args) = cli.command {
        clap_complete::generate(
            args.shell,
            &mut <Cli as clap::CommandFactory>::command(),
            "dataforge-run",
            &mut std::io::stdout(),
        );
        return;
    }

    let log_guard = match logging::init(verbosity, cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "ERROR".red().bold(), e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, verbosity).await,
        Commands::Completion(_) => unreachable!("completion handled above"),
    };

    // `process::exit` skips destructors, so flush file logs first.
    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n{} {:#}", "FAILED".red().bold(), e);
            1
        }
    };
    drop(log_guard);
    std::process::exit(code);
}
