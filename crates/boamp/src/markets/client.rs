use crate::prelude::*;
use boamp_core::market::{backend_error_message, MarketRecord, RecordsResponse};
use boamp_core::query::RecordsQuery;
use std::time::Duration;

/// BOAMP API configuration resolved from CLI flags / environment variables
#[derive(Debug, Clone)]
pub struct BoampConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl BoampConfig {
    /// Default BOAMP records endpoint on the DILA open-data portal
    pub const DEFAULT_BASE_URL: &'static str =
        "https://boamp-datadila.opendatasoft.com/api/explore/v2.1/catalog/datasets/boamp/records";

    pub fn from_global(global: &crate::Global) -> Self {
        Self {
            base_url: global.base_url.clone(),
            timeout: (global.timeout > 0).then(|| Duration::from_secs(global.timeout)),
        }
    }
}

/// Create the HTTP client used for every BOAMP request
pub fn create_client(config: &BoampConfig) -> Result<reqwest::Client> {
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("boamp/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

/// Handle on the BOAMP `records` endpoint
///
/// Constructed once at startup and passed to every data function, so tests
/// can point it at a local mock server.
#[derive(Debug, Clone)]
pub struct BoampClient {
    client: reqwest::Client,
    base_url: String,
}

impl BoampClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &BoampConfig) -> Result<Self> {
        Ok(Self::new(create_client(config)?, config.base_url.clone()))
    }

    /// Issue one GET against the records endpoint and return its rows
    ///
    /// Transport and HTTP failures become `MarketError::Backend`, carrying
    /// the backend's `message` when it sent one.
    pub async fn fetch_records(&self, query: &RecordsQuery) -> Result<Vec<MarketRecord>, MarketError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&query.to_pairs())
            .send()
            .await
            .map_err(|e| {
                log::error!("BOAMP request failed: {e}");
                MarketError::Backend(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let transport_message = response
                .error_for_status_ref()
                .err()
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("HTTP {status}"));
            let body = response.text().await.unwrap_or_default();
            let message = backend_error_message(&body).unwrap_or(transport_message);
            log::error!("BOAMP API error [{status}]: {message}");
            return Err(MarketError::Backend(message));
        }

        let records: RecordsResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse BOAMP response: {e}");
            MarketError::Backend(format!("Failed to parse response: {e}"))
        })?;

        Ok(records.into_records())
    }
}
