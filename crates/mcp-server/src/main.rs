//! jsontools MCP server
//!
//! Query and script-update JSON / NDJSON files from an MCP client.
//!
//! ## Tools
//!
//! - `json_query` - values matched by a JSONPath expression
//! - `json_nodes` - matched values with their location
//! - `json_eval` - run a script over one file, optionally rewriting it
//! - `json_multi_eval` - run a script over several files, optionally rewriting some of them
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "jsontools": {
//!       "command": "jsontools-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use jsontools_engine::EngineConfig;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

mod tools;

use tools::JsonToolsService;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = EngineConfig::from_env();
    log::info!(
        "Starting jsontools MCP server (script budget {} ms)",
        config.timeout.as_millis()
    );

    let service = JsonToolsService::new(config);
    let server = service.serve(stdio()).await?;

    server.waiting().await?;

    log::info!("jsontools MCP server stopped");
    Ok(())
}
