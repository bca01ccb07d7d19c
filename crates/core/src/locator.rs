//! Resource locators of the form `boamp://market/<idweb>`

use regex::Regex;
use std::sync::LazyLock;

use crate::error::MarketError;

pub const SCHEME: &str = "boamp";
pub const MARKET_URI_TEMPLATE: &str = "boamp://market/{idweb}";
pub const MARKET_MIME_TYPE: &str = "application/json";

static MARKET_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^boamp://market/([^/]+)$").expect("valid market URI regex"));

/// Extract the market identifier from a resource URI
///
/// Fails with `InvalidLocator` for anything that is not exactly one
/// non-empty path segment under `boamp://market/`.
pub fn parse_market_uri(uri: &str) -> Result<&str, MarketError> {
    MARKET_URI
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| MarketError::InvalidLocator(uri.to_string()))
}

/// Build the resource URI for a market identifier
pub fn market_uri(idweb: &str) -> String {
    format!("{SCHEME}://market/{idweb}")
}
