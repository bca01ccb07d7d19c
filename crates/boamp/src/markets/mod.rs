use crate::prelude::{eprintln, *};

pub mod client;
pub mod details;
pub mod search;

pub use client::{BoampClient, BoampConfig};
pub use details::get_market_details_data;
pub use search::search_markets_data;

/// Markets module app - root command
#[derive(Debug, clap::Parser)]
#[command(name = "markets")]
#[command(about = "Search and read BOAMP public market notices")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Search open market notices
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// Show every field of a single market notice
    #[clap(name = "get")]
    Get(details::GetOptions),
}

/// Module entry point
pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = BoampConfig::from_global(&global);

    if global.verbose {
        eprintln!("BOAMP API: {}", config.base_url);
        eprintln!();
    }

    let client = BoampClient::from_config(&config)?;

    match app.command {
        Commands::Search(options) => search::run(options, &client).await,
        Commands::Get(options) => details::run(options, &client).await,
    }
}
