use crate::prelude::eprintln;
use boamp_core::locator::{market_uri, parse_market_uri, MARKET_MIME_TYPE, MARKET_URI_TEMPLATE};
use serde::{Deserialize, Serialize};

use super::tools::to_result_value;
use super::{JsonRpcError, McpServer, INTERNAL_ERROR, INVALID_PARAMS};

#[derive(Debug, Serialize)]
pub struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ResourceTemplatesList {
    #[serde(rename = "resourceTemplates")]
    pub resource_templates: Vec<ResourceTemplate>,
}

#[derive(Debug, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContent>,
}

/// Markets are only reachable through the template, never enumerated
pub fn handle_resources_list() -> Result<serde_json::Value, JsonRpcError> {
    Ok(serde_json::json!({ "resources": [] }))
}

pub fn handle_resource_templates_list() -> Result<serde_json::Value, JsonRpcError> {
    let result = ResourceTemplatesList {
        resource_templates: vec![ResourceTemplate {
            uri_template: MARKET_URI_TEMPLATE.to_string(),
            name: "Public market details".to_string(),
            mime_type: MARKET_MIME_TYPE.to_string(),
            description: "Full record of a public market notice, by identifier".to_string(),
        }],
    };

    to_result_value(result)
}

pub async fn handle_resources_read(
    params: Option<serde_json::Value>,
    server: &McpServer,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: ReadResourceParams =
        serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
            .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;

    let idweb = parse_market_uri(&params.uri)?;

    if server.verbose {
        eprintln!("Reading resource: {}", params.uri);
    }

    let record = crate::markets::get_market_details_data(&server.client, idweb).await?;

    let text = serde_json::to_string_pretty(&record)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {e}")))?;

    to_result_value(ReadResourceResult {
        contents: vec![ResourceContent {
            uri: market_uri(idweb),
            mime_type: MARKET_MIME_TYPE.to_string(),
            text,
        }],
    })
}
