use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryRequest {
    /// Path to the JSON or NDJSON file
    #[schemars(
        description = "Path to the JSON or NDJSON file. Prefer absolute paths; relative paths resolve against the server's working directory."
    )]
    pub file_path: String,

    /// JSONPath expression
    #[schemars(
        description = "JSONPath expression (RFC 9535), e.g. `$.items[*].id` or `$[?@.price > 10]`. NDJSON files are queried as an array of rows."
    )]
    pub json_path: String,

    /// Maximum number of results
    #[schemars(description = "Maximum number of results to return (omit or 0 for all)")]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EvalRequest {
    #[schemars(description = "Path to the JSON or NDJSON file")]
    pub file_path: String,

    /// Rhai script
    #[schemars(
        description = "Rhai script. The file content is bound to `data`; helper modules `util` and `jp` are available. Finish with `#{ \"type\": \"updateFile\", \"data\": value }` to rewrite the file in its original format; any other final value is returned as-is."
    )]
    pub code: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MultiEvalRequest {
    #[schemars(description = "Paths to the JSON or NDJSON files, in the order scripts see them")]
    pub file_paths: Vec<String>,

    #[schemars(
        description = "Rhai script. `data` is an array of file contents in `file_paths` order. Finish with `#{ \"type\": \"updateMultipleFiles\", \"updates\": [#{ \"index\": 0, \"data\": value }] }` to rewrite files; each keeps its original format."
    )]
    pub code: String,
}
