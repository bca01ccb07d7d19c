mod cli;
mod resources;
mod sse;
mod stdio;
mod tools;

pub use cli::App;

use crate::markets::{BoampClient, BoampConfig};
use crate::prelude::*;
use serde::{Deserialize, Serialize};

// JSON-RPC 2.0 error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// Outer `None` when the member is absent, inner `None` for `"id": null`
    #[serde(default, deserialize_with = "present")]
    id: Option<Option<serde_json::Value>>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Protocol-level mapping of market failures
impl From<MarketError> for JsonRpcError {
    fn from(err: MarketError) -> Self {
        let code = match &err {
            MarketError::InvalidLocator(_) => INVALID_REQUEST,
            MarketError::NotFound(_) | MarketError::InvalidArgument(_) => INVALID_PARAMS,
            MarketError::UnknownOperation(_) => METHOD_NOT_FOUND,
            MarketError::Backend(_) => INTERNAL_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

fn present<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<serde_json::Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<serde_json::Value>::deserialize(deserializer).map(Some)
}

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Everything a request handler needs, shared by both transports
#[derive(Debug, Clone)]
pub struct McpServer {
    pub verbose: bool,
    pub client: BoampClient,
}

impl McpServer {
    pub fn new(client: BoampClient, verbose: bool) -> Self {
        Self { verbose, client }
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = BoampConfig::from_global(&global);
    let server = McpServer::new(BoampClient::from_config(&config)?, global.verbose);

    log::info!("starting BOAMP MCP server against {}", config.base_url);

    match app.command {
        cli::Commands::Stdio => stdio::run_stdio(server).await,
        cli::Commands::Sse(options) => sse::run_sse(options, server).await,
    }
}

/// Resolves on the first Ctrl-C. Never resolves if the handler cannot be installed.
pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("interrupt received, shutting down");
}

/// Dispatch one JSON-RPC message
///
/// Returns `None` for notifications (messages without an `id` member), which
/// must not be answered. A request carrying `"id": null` is answered with a
/// null id.
pub async fn handle_request(request_str: &str, server: &McpServer) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}"))),
            });
        }
    };

    let Some(id) = request.id else {
        log::debug!("notification: {}", request.method);
        return None;
    };

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, server).await,
        "resources/list" => resources::handle_resources_list(),
        "resources/templates/list" => resources::handle_resource_templates_list(),
        "resources/read" => resources::handle_resources_read(request.params, server).await,
        method => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )),
    };

    let response = match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        },
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_server(mock_server: &MockServer) -> McpServer {
        McpServer::new(
            BoampClient::new(reqwest::Client::new(), mock_server.uri()),
            false,
        )
    }

    async fn call(server: &McpServer, request: Value) -> Value {
        let response = handle_request(&request.to_string(), server)
            .await
            .expect("request with id must be answered");
        serde_json::to_value(response).unwrap()
    }

    async fn mount_rows(mock_server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(mock_server)
            .await;
    }

    fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        })
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools_and_resources() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "boamp-server");
        assert!(response["result"]["capabilities"]["tools"].is_object());
        assert!(response["result"]["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = handle_request("{not json", &server).await.unwrap();
        let response = serde_json::to_value(response).unwrap();

        assert_eq!(response["error"]["code"], PARSE_ERROR);
        assert_eq!(response["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handle_request(&request.to_string(), &server).await.is_none());
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(&server, json!({"jsonrpc": "2.0", "id": null, "method": "ping"})).await;

        assert_eq!(response["id"], Value::Null);
        assert!(response.as_object().unwrap().contains_key("id"));
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/list"}),
        )
        .await;

        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ping() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;

        assert_eq!(response["id"], "p");
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}),
        )
        .await;

        let tools = response["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["get_public_markets", "get_market_details"]);

        let search_schema = &tools[0]["inputSchema"];
        assert_eq!(search_schema["required"], json!(["keywords"]));
        assert_eq!(search_schema["properties"]["limit"]["maximum"], 100);
        assert_eq!(
            search_schema["properties"]["sort_by"]["enum"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
        assert_eq!(tools[1]["inputSchema"]["required"], json!(["idweb"]));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(&server, tool_call(4, "delete_market", json!({}))).await;

        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["error"]["message"], "Unknown tool: delete_market");
    }

    #[tokio::test]
    async fn test_search_tool_returns_rows_as_json_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("limit", "5"))
            .and(query_param("refine", "type_marche:SERVICES"))
            .and(query_param("order_by", "datelimitereponse ASC"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"total_count": 1, "results": [{"idweb": "24-1", "objet": "Audit"}]}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            tool_call(
                5,
                "get_public_markets",
                json!({"keywords": ["audit"], "type": "SERVICES", "limit": 5, "sort_by": "bogus"}),
            ),
        )
        .await;

        let result = &response["result"];
        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        let rows: Value = serde_json::from_str(text).unwrap();
        assert_eq!(rows, json!([{"idweb": "24-1", "objet": "Audit"}]));
    }

    #[tokio::test]
    async fn test_search_tool_tolerates_missing_keywords() {
        let mock_server = MockServer::start().await;
        mount_rows(&mock_server, r#"{"results": []}"#).await;
        let server = test_server(&mock_server);

        let response = call(&server, tool_call(6, "get_public_markets", json!({}))).await;

        assert_eq!(response["result"]["content"][0]["text"], "[]");
    }

    #[tokio::test]
    async fn test_search_tool_rejects_unknown_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            tool_call(7, "get_public_markets", json!({"type": "CONCESSIONS"})),
        )
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_search_tool_backend_failure_is_flagged_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error_code": "ODSQLError", "message": "Bad where"}"#),
            )
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            tool_call(8, "get_public_markets", json!({"keywords": ["x"]})),
        )
        .await;

        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(text, "Search failed: BOAMP API error: Bad where");
    }

    #[tokio::test]
    async fn test_details_tool_returns_record() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("where", "idweb=\"24-42\""))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results": [{"idweb": "24-42", "nomacheteur": "CHU de Lille"}]}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            tool_call(9, "get_market_details", json!({"idweb": "24-42"})),
        )
        .await;

        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let record: Value = serde_json::from_str(text).unwrap();
        assert_eq!(record, json!({"idweb": "24-42", "nomacheteur": "CHU de Lille"}));
    }

    #[tokio::test]
    async fn test_details_tool_not_found_is_flagged_content() {
        let mock_server = MockServer::start().await;
        mount_rows(&mock_server, r#"{"results": []}"#).await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            tool_call(10, "get_market_details", json!({"idweb": "NOPE"})),
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Failed to fetch market details: Market with identifier NOPE not found"
        );
    }

    #[tokio::test]
    async fn test_details_tool_requires_identifier() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let missing = call(&server, tool_call(11, "get_market_details", json!({}))).await;
        assert_eq!(missing["error"]["code"], INVALID_PARAMS);

        let empty = call(
            &server,
            tool_call(12, "get_market_details", json!({"idweb": "  "})),
        )
        .await;
        assert_eq!(empty["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resource_templates_list() {
        let mock_server = MockServer::start().await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 13, "method": "resources/templates/list"}),
        )
        .await;

        let template = &response["result"]["resourceTemplates"][0];
        assert_eq!(template["uriTemplate"], "boamp://market/{idweb}");
        assert_eq!(template["mimeType"], "application/json");

        let listed = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 14, "method": "resources/list"}),
        )
        .await;
        assert_eq!(listed["result"]["resources"], json!([]));
    }

    #[tokio::test]
    async fn test_resource_read_returns_record() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("where", "idweb=\"ABC123\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"results": [{"idweb": "ABC123", "objet": "Ponts"}]}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 15,
                "method": "resources/read",
                "params": {"uri": "boamp://market/ABC123"}
            }),
        )
        .await;

        let content = &response["result"]["contents"][0];
        assert_eq!(content["uri"], "boamp://market/ABC123");
        assert_eq!(content["mimeType"], "application/json");
        assert_eq!(
            content["text"],
            serde_json::to_string_pretty(&json!({"idweb": "ABC123", "objet": "Ponts"})).unwrap()
        );
    }

    #[tokio::test]
    async fn test_resource_read_invalid_locator_skips_backend() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 16,
                "method": "resources/read",
                "params": {"uri": "boamp://market/"}
            }),
        )
        .await;

        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(
            response["error"]["message"],
            "Invalid resource URI: boamp://market/"
        );
    }

    #[tokio::test]
    async fn test_resource_read_not_found() {
        let mock_server = MockServer::start().await;
        mount_rows(&mock_server, r#"{"results": []}"#).await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 17,
                "method": "resources/read",
                "params": {"uri": "boamp://market/GONE"}
            }),
        )
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resource_read_backend_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;
        let server = test_server(&mock_server);

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 18,
                "method": "resources/read",
                "params": {"uri": "boamp://market/X"}
            }),
        )
        .await;

        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        let message = response["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("BOAMP API error: "), "{message}");
    }
}
