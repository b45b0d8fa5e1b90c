//! hardwire - island server with streamed partial updates.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use hardwire::cli::{self, Cli, Commands};
use hardwire::config::HardwireConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    hardwire::core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = HardwireConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { .. } => cli::serve::run(&config),
        Commands::Check { .. } => cli::check::run(&config),
    }
}
