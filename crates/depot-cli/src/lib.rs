//! # depot-cli
//!
//! Command-line interface for the depot release repository.
//!
//! ## Commands
//!
//! - `depot update` - Reconcile the bucket and write the manifests
//!
//! ## Configuration
//!
//! Repository settings come from `DEPOT_*` environment variables (see
//! [`depot_repo::RepoConfig::from_env`]); run-local settings such as
//! the bucket root and output directory are flags.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use clap::{Parser, Subcommand};
use depot_core::LogFormat;

/// Depot CLI - release repository maintenance.
#[derive(Debug, Parser)]
#[command(name = "depot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log output format.
    #[arg(long, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the bucket and write the channel manifests.
    Update(commands::update::UpdateArgs),
}

/// Log format flag.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormatArg {
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
    /// JSON structured logs (for production).
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_command_parses() {
        let cli = Cli::parse_from([
            "depot",
            "--log-format",
            "json",
            "update",
            "--root",
            "/srv/bucket",
            "--out",
            "/srv/manifests",
        ]);

        assert!(matches!(cli.log_format, LogFormatArg::Json));
        let Commands::Update(args) = cli.command;
        assert_eq!(args.root, std::path::PathBuf::from("/srv/bucket"));
        assert_eq!(args.out, std::path::PathBuf::from("/srv/manifests"));
    }
}
