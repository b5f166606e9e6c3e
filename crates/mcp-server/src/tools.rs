//! MCP tools for jsontools

mod schemas;

use jsontools_engine::{EngineConfig, EngineError, JsonTools};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Serialize;
use std::path::PathBuf;

pub use schemas::{EvalRequest, MultiEvalRequest, QueryRequest};

#[derive(Clone)]
pub struct JsonToolsService {
    tools: JsonTools,
    tool_router: ToolRouter<Self>,
}

impl JsonToolsService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tools: JsonTools::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for JsonToolsService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("jsontools reads and updates JSON / NDJSON files. Use 'json_query' or 'json_nodes' to inspect a file with JSONPath, 'json_eval' to run a Rhai script over one file, and 'json_multi_eval' to run one over several files at once. Scripts see the data as `data` and cannot touch anything else.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

fn tool_error(tool: &str, err: &EngineError) -> CallToolResult {
    log::debug!("{tool} failed: {err}");
    CallToolResult::error(vec![Content::text(err.to_envelope().render_text())])
}

fn json_text<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(err) => CallToolResult::error(vec![Content::text(format!(
            "error: internal\nfailed to serialize result: {err}"
        ))]),
    }
}

#[tool_router]
impl JsonToolsService {
    /// JSONPath query returning matched values
    #[tool(
        description = "Query a JSON or NDJSON file with a JSONPath expression. Returns a JSON array of the matched values."
    )]
    pub async fn json_query(
        &self,
        Parameters(request): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .tools
            .query(&request.file_path, &request.json_path, request.count)
            .await
        {
            Ok(values) => Ok(json_text(&values)),
            Err(err) => Ok(tool_error("json_query", &err)),
        }
    }

    /// JSONPath query returning matched values with their paths
    #[tool(
        description = "Query a JSON or NDJSON file with a JSONPath expression. Returns a JSON array of `{path, value}` where path is like [\"$\", \"items\", 0]."
    )]
    pub async fn json_nodes(
        &self,
        Parameters(request): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .tools
            .nodes(&request.file_path, &request.json_path, request.count)
            .await
        {
            Ok(nodes) => Ok(json_text(&nodes)),
            Err(err) => Ok(tool_error("json_nodes", &err)),
        }
    }

    /// Script evaluation over one file
    #[tool(
        description = "Run a Rhai script over one JSON or NDJSON file (bound to `data`). Returning `#{ \"type\": \"updateFile\", \"data\": value }` rewrites the file in its original format; any other value is returned."
    )]
    pub async fn json_eval(
        &self,
        Parameters(request): Parameters<EvalRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.tools.eval(&request.file_path, &request.code).await {
            Ok(report) => Ok(CallToolResult::success(vec![Content::text(
                report.render_text(),
            )])),
            Err(err) => Ok(tool_error("json_eval", &err)),
        }
    }

    /// Script evaluation over several files
    #[tool(
        description = "Run a Rhai script over several JSON or NDJSON files (`data` is the array of their contents). Returning `#{ \"type\": \"updateMultipleFiles\", \"updates\": [#{ \"index\": i, \"data\": value }] }` rewrites the indicated files; every index is checked before anything is written."
    )]
    pub async fn json_multi_eval(
        &self,
        Parameters(request): Parameters<MultiEvalRequest>,
    ) -> Result<CallToolResult, McpError> {
        let paths: Vec<PathBuf> = request.file_paths.iter().map(PathBuf::from).collect();
        match self.tools.multi_eval(&paths, &request.code).await {
            Ok(report) => Ok(CallToolResult::success(vec![Content::text(
                report.render_text(),
            )])),
            Err(err) => Ok(tool_error("json_multi_eval", &err)),
        }
    }
}
