use anyhow::Result;
use clap::Parser;
use sqlwing_cli::args::Cli;
use sqlwing_cli::exec::execute;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging stays off unless a logging option was given.
    if cli.log_mode.is_some() || cli.verbose > 0 {
        logutil::init(cli.verbose, cli.log_mode.unwrap_or_default().into());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting...");

    let out = execute(&cli)?;
    println!("{out}");
    Ok(())
}
