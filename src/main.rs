mod cli;
mod config;
mod error;
mod history;
mod metrics;
mod output;
mod record;
mod store;
mod tracker;
mod window;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::debug;

fn main() -> Result<()> {
    // Skipped history lines are warnings; RUST_LOG=debug adds per-metric summaries
    env_logger::init();
    output::print_banner();

    let cli = Cli::parse();
    debug!("Parsed command line, loading configuration");
    cli.execute()
}
