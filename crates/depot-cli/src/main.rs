//! Depot CLI - release repository maintenance.
//!
//! The main entry point for the `depot` binary.

use anyhow::Result;
use clap::Parser;

use depot_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    depot_core::init_logging(cli.log_format.into());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Update(args) => depot_cli::commands::update::execute(args).await,
        }
    })
}
