use std::io;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use updater_cli::commands::{
    scan_cmd::{self, ScanArgs},
    update_cmd::{self, UpdateCommands},
};
use updater_cli::config::UpdaterConfig;
use updater_cli::errors::Error;

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Updater: override values in CUE files and Timoni bundles
#[derive(Parser, Debug)]
#[command(name = "updater")]
#[command(
    about = "A helper tool for modifying CUE files to override arbitrary values. Useful for updating Timoni bundles.",
    long_about = None
)]
struct Cli {
    /// Path to the configuration file (defaults to ./updater.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scans a directory for deployment files
    Scan(ScanArgs),

    /// Overrides a target path in a CUE file with the given value
    #[command(subcommand)]
    Update(UpdateCommands),
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = UpdaterConfig::resolve(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Scan(args) => scan_cmd::execute(args, &config, &mut stdout),
        Commands::Update(cmd) => {
            update_cmd::execute(cmd, &config, &mut io::stdin().lock(), &mut stdout)
        }
    }
}

fn main() {
    // Logs go to stderr; stdout carries JSON and rendered documents.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("UPDATER_LOG")
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!(message = "Command failed", error = ?e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
