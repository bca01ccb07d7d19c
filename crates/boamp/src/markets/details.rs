use crate::prelude::{println, *};
use boamp_core::market::{select_market, MarketRecord};
use boamp_core::query::build_details_query;
use colored::Colorize;

use super::BoampClient;

#[derive(Debug, clap::Args, Clone)]
pub struct GetOptions {
    /// Market identifier (idweb), e.g. 24-98765
    #[arg(value_name = "IDWEB")]
    pub idweb: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by the CLI, the MCP tool and the MCP resource
///
/// Looks a market up by exact identifier and returns the first row. No row
/// is a `NotFound`.
pub async fn get_market_details_data(
    client: &BoampClient,
    idweb: &str,
) -> Result<MarketRecord, MarketError> {
    log::info!("fetching market details: {idweb}");

    let records = client.fetch_records(&build_details_query(idweb)).await?;

    select_market(records, idweb)
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Render every field of a record as `key: value` lines
fn format_market_text(record: &MarketRecord) -> String {
    let width = record.keys().map(|k| k.len()).max().unwrap_or(0);

    record
        .iter()
        .map(|(key, value)| {
            format!(
                "{}: {}",
                format!("{key:>width$}").green(),
                format_value(value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn run(options: GetOptions, client: &BoampClient) -> Result<()> {
    if options.idweb.trim().is_empty() {
        return Err(eyre!("Market identifier cannot be empty"));
    }

    let record = get_market_details_data(client, &options.idweb).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", format_market_text(&record));
    }

    Ok(())
}
