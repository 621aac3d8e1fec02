use std::process::ExitCode;
use std::time::Instant;

use anstream::eprintln;
use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use spool_logging::{Level, setup_logging};

use crate::resolve_cli::ResolveCliArgs;

mod resolve_cli;

#[derive(Parser)]
#[command(name = "spool-dev", version)]
struct Cli {
    /// Use verbose output; repeat for more detail.
    #[arg(global = true, long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Resolve requirements against a JSON index snapshot.
    Resolve(ResolveCliArgs),
}

#[instrument(skip_all)]
fn run(command: Command) -> Result<()> {
    match command {
        Command::Resolve(args) => resolve_cli::resolve_cli(args)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(Level::from_verbosity(cli.verbose)) {
        eprintln!("{}: {err:#}", "error".red().bold());
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    let result = run(cli.command);
    debug!("Took {}ms", start.elapsed().as_millis());
    if let Err(err) = result {
        eprintln!("{}", "spool-dev failed".red().bold());
        for err in err.chain() {
            eprintln!("  {}: {}", "Caused by".red().bold(), err);
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
