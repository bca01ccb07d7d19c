use crate::prelude::{eprintln, *};
use boamp_core::market::MarketType;
use boamp_core::query::SearchParams;
use serde::Deserialize;

use super::{to_result_value, CallToolResult, JsonRpcError, McpServer, INTERNAL_ERROR, INVALID_PARAMS};

fn invalid_arguments(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(INVALID_PARAMS, format!("Invalid arguments: {e}"))
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String, JsonRpcError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {e}")))
}

/// Handle public market search via MCP
pub async fn handle_get_public_markets(
    arguments: Option<serde_json::Value>,
    server: &McpServer,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct GetPublicMarketsArgs {
        keywords: Option<Vec<String>>,
        #[serde(rename = "type")]
        market_type: Option<String>,
        limit: Option<f64>,
        sort_by: Option<String>,
        departments: Option<Vec<String>>,
    }

    let args: GetPublicMarketsArgs =
        serde_json::from_value(arguments.unwrap_or(serde_json::json!({})))
            .map_err(invalid_arguments)?;

    let market_type = args
        .market_type
        .as_deref()
        .map(MarketType::parse)
        .transpose()
        .map_err(JsonRpcError::from)?;

    let params = SearchParams::new(
        args.keywords,
        market_type,
        args.limit.map(|n| n as i64),
        args.sort_by.as_deref(),
        args.departments,
    );

    if server.verbose {
        eprintln!(
            "Calling get_public_markets: keywords={:?}, type={:?}, limit={}, sort={}, departments={:?}",
            params.keywords(),
            params.market_type(),
            params.limit(),
            params.sort(),
            params.departments()
        );
    }

    let result = match crate::markets::search_markets_data(&server.client, &params).await {
        Ok(records) => CallToolResult::text(to_json_text(&records)?),
        Err(e) => {
            log::error!("market search failed: {e}");
            CallToolResult::error(format!("Search failed: {e}"))
        }
    };

    to_result_value(result)
}

/// Handle single market lookup via MCP
pub async fn handle_get_market_details(
    arguments: Option<serde_json::Value>,
    server: &McpServer,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct GetMarketDetailsArgs {
        idweb: String,
    }

    let args: GetMarketDetailsArgs =
        serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null))
            .map_err(invalid_arguments)?;

    let idweb = args.idweb.trim();
    if idweb.is_empty() {
        return Err(invalid_arguments("idweb cannot be empty"));
    }

    if server.verbose {
        eprintln!("Calling get_market_details: idweb={idweb}");
    }

    let result = match crate::markets::get_market_details_data(&server.client, idweb).await {
        Ok(record) => CallToolResult::text(to_json_text(&record)?),
        Err(e) => {
            log::error!("market lookup failed: {e}");
            CallToolResult::error(format!("Failed to fetch market details: {e}"))
        }
    };

    to_result_value(result)
}
