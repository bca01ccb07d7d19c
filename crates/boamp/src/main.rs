use crate::prelude::*;
use clap::Parser;

mod markets;
mod mcp;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Search French public procurement notices (BOAMP) from the command line or over MCP"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// BOAMP records endpoint
    #[clap(
        long,
        env = "BOAMP_API_URL",
        global = true,
        default_value = markets::BoampConfig::DEFAULT_BASE_URL
    )]
    base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    #[clap(long, env = "BOAMP_TIMEOUT", global = true, default_value = "30")]
    timeout: u64,

    /// Whether to display additional information.
    #[clap(long, env = "BOAMP_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Public market notices (search, details)
    Markets(crate::markets::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Markets(sub_app) => crate::markets::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
