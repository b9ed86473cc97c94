//! `phaselog` - time the phases of a job

use clap::Parser;

use phaselog::cli::args::Cli;
use phaselog::cli::commands;
use phaselog::error::ExitCode;
use phaselog::observability::init_logging;

fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    match commands::dispatch(cli) {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
