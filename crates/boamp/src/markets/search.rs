use crate::prelude::{println, *};
use boamp_core::market::{summarize_market, MarketRecord, MarketType};
use boamp_core::query::{build_search_query, SearchParams};
use chrono::NaiveDate;

use super::BoampClient;

#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Open IT notices, soonest deadline first:
  boamp markets search informatique

  # Works in Paris and Hauts-de-Seine, newest first:
  boamp markets search voirie --type TRAVAUX --department 75 --department 92 --sort \"dateparution DESC\"

NOTES:
  - Only notices whose response deadline is today or later are returned
  - Each keyword is matched against the notice subject and its descriptors")]
pub struct SearchOptions {
    /// Keywords matched against the notice subject and descriptors
    #[arg(value_name = "KEYWORD")]
    pub keywords: Vec<String>,

    /// Market type: SERVICES, TRAVAUX (WORKS) or FOURNITURES (SUPPLIES)
    #[arg(short = 't', long = "type")]
    pub market_type: Option<MarketType>,

    /// Maximum number of results (1-100)
    #[arg(short, long, default_value = "20")]
    pub limit: i64,

    /// Sort order: "dateparution ASC|DESC" or "datelimitereponse ASC|DESC"
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Department code (repeatable)
    #[arg(short, long = "department", value_name = "CODE")]
    pub departments: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
///
/// Builds the filter for `params` against today's UTC date and issues a
/// single request. An empty result set is not an error.
pub async fn search_markets_data(
    client: &BoampClient,
    params: &SearchParams,
) -> Result<Vec<MarketRecord>, MarketError> {
    search_markets_as_of(client, params, chrono::Utc::now().date_naive()).await
}

/// Same as [`search_markets_data`], with the deadline cutoff given explicitly
async fn search_markets_as_of(
    client: &BoampClient,
    params: &SearchParams,
    today: NaiveDate,
) -> Result<Vec<MarketRecord>, MarketError> {
    let query = build_search_query(params, today);

    log::debug!("search parameters: {params:?}");
    log::debug!("records query: {query:?}");

    let records = client.fetch_records(&query).await?;

    log::info!("search returned {} market(s)", records.len());

    Ok(records)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

pub async fn run(options: SearchOptions, client: &BoampClient) -> Result<()> {
    let params = SearchParams::new(
        Some(options.keywords),
        options.market_type,
        Some(options.limit),
        options.sort.as_deref(),
        Some(options.departments),
    );

    let records = search_markets_data(client, &params).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("Found {} open market(s):\n", records.len());

    if records.is_empty() {
        println!("No markets found.");
        return Ok(());
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row!["ID", "Deadline", "Dept", "Buyer", "Subject"]);

    for record in &records {
        let summary = summarize_market(record);
        table.add_row(prettytable::row![
            summary.idweb,
            summary.deadline,
            summary.department,
            truncate(&summary.buyer, 30),
            truncate(&summary.objet, 60)
        ]);
    }

    table.printstd();

    Ok(())
}
