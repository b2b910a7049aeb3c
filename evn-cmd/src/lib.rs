//! Command implementations for the EVN reservoir CLI.
//!
//! Provides a subcommand that collects hourly readings for one reservoir
//! and one that lists the bundled reservoir catalogue.

use clap::Subcommand;

pub mod reservoirs;
pub mod scrape;

pub use scrape::ScrapeArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect hourly readings for a reservoir and export them to CSV/XLSX
    Scrape(ScrapeArgs),

    /// List the reservoirs with known portal identifiers
    Reservoirs,
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scrape(args) => scrape::run_scrape(&args).await,
        Command::Reservoirs => reservoirs::run_list(),
    }
}
