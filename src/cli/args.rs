//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Hardwire island server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Views directory path (relative to project root)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub views: Option<PathBuf>,

    /// Config file path (default: hardwire.toml)
    #[arg(short = 'C', long, global = true, default_value = "hardwire.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load views and resources, then serve them
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Number of request worker threads
        #[arg(short, long)]
        threads: Option<usize>,

        /// Enable verbose output (access log, pipeline summaries)
        #[arg(short = 'V', long)]
        verbose: bool,
    },

    /// Load views and resources, report configuration problems, and exit
    #[command(visible_alias = "c")]
    Check {
        /// Enable verbose output
        #[arg(short = 'V', long)]
        verbose: bool,
    },
}

impl Cli {
    pub const fn verbose(&self) -> bool {
        match self.command {
            Commands::Serve { verbose, .. } | Commands::Check { verbose } => verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["hardwire", "serve", "-p", "9000", "-i", "0.0.0.0", "-V"]).unwrap();
        assert!(cli.verbose());
        match cli.command {
            Commands::Serve { port, interface, threads, .. } => {
                assert_eq!(port, Some(9000));
                assert_eq!(interface.map(|i| i.to_string()).as_deref(), Some("0.0.0.0"));
                assert_eq!(threads, None);
            }
            Commands::Check { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_check_with_config() {
        let cli = Cli::try_parse_from(["hardwire", "check", "-C", "site/hardwire.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { verbose: false }));
        assert_eq!(cli.config, PathBuf::from("site/hardwire.toml"));
    }
}
