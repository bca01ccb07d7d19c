mod markets;

use serde::{Deserialize, Serialize};

use boamp_core::market::{MarketType, SortOrder};
use boamp_core::query::{DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};
use boamp_core::MarketError;

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, McpServer, Tool, INTERNAL_ERROR, INVALID_PARAMS};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
    pub resources: Option<ResourcesCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct ResourcesCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![Content::Text { text }],
            is_error: None,
        }
    }

    /// Operational failure reported as content so the calling agent can read it
    pub fn error(text: String) -> Self {
        Self {
            content: vec![Content::Text { text }],
            is_error: Some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

pub(super) fn to_result_value<T: Serialize>(value: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {e}")))
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
            resources: Some(ResourcesCapability {}),
        },
        server_info: ServerInfo {
            name: "boamp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    to_result_value(result)
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let market_types: Vec<&str> = MarketType::ALL.iter().map(|t| t.facet_value()).collect();
    let sort_orders: Vec<&str> = SortOrder::ALL.iter().map(|s| s.as_str()).collect();

    let tools = vec![
        Tool {
            name: "get_public_markets".to_string(),
            description: "Search French public procurement notices (BOAMP) that are still open for response. Matches each keyword against the notice subject and its descriptors, and can filter by market type and department codes. Returns the matching notices as a JSON array.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keywords to search for (any keyword may match)"
                    },
                    "type": {
                        "type": "string",
                        "description": "Market type (SERVICES, TRAVAUX, FOURNITURES)",
                        "enum": market_types
                    },
                    "limit": {
                        "type": "number",
                        "description": format!("Maximum number of results to return (default: {DEFAULT_LIMIT})"),
                        "minimum": MIN_LIMIT,
                        "maximum": MAX_LIMIT
                    },
                    "sort_by": {
                        "type": "string",
                        "description": "Sort order (default: datelimitereponse ASC)",
                        "enum": sort_orders
                    },
                    "departments": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Department codes (e.g. 75, 92, 2A)"
                    }
                },
                "required": ["keywords"]
            }),
        },
        Tool {
            name: "get_market_details".to_string(),
            description: "Get the full record of a single public market notice by its BOAMP identifier (idweb).".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "idweb": {
                        "type": "string",
                        "description": "Market identifier (e.g. 24-98765)"
                    }
                },
                "required": ["idweb"]
            }),
        },
    ];

    to_result_value(ToolsList { tools })
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    server: &McpServer,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;

    match params.name.as_str() {
        "get_public_markets" => markets::handle_get_public_markets(params.arguments, server).await,
        "get_market_details" => markets::handle_get_market_details(params.arguments, server).await,
        _ => Err(MarketError::UnknownOperation(params.name).into()),
    }
}
