use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default wall-clock budget for a single script run.
pub const DEFAULT_EVAL_TIMEOUT_MS: u64 = 30_000;

/// On-disk shape of a data file, detected on read and reused on write.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// One JSON document.
    Single,
    /// One JSON value per non-blank line (NDJSON).
    LineDelimited,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::LineDelimited => "line-delimited",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Plain-text rendering used by the MCP tools and the CLI.
    pub fn render_text(&self) -> String {
        let mut out = format!("error: {}\n{}", self.code, self.message);
        if let Some(hint) = self.hint.as_deref().filter(|h| !h.trim().is_empty()) {
            out.push_str("\nhint: ");
            out.push_str(hint);
        }
        out
    }
}

/// One element of a located path: `"$"`, an object key, or an array index.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// A path-annotated query match, e.g. `{"path": ["$", "a", 0], "value": 1}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct Node {
    pub path: Vec<PathSegment>,
    pub value: serde_json::Value,
}

/// Outcome of a single-file evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalReport {
    Updated { path: String, format: Format },
    Value(serde_json::Value),
    Nothing,
}

/// Outcome of a multi-file evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiEvalReport {
    Updated { files: Vec<String> },
    Value(serde_json::Value),
    Nothing,
}

const NO_OUTPUT: &str = "Evaluation produced no output.";

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

impl EvalReport {
    pub fn render_text(&self) -> String {
        match self {
            Self::Updated { path, format } => {
                format!("Successfully updated {format} file: {path}")
            }
            Self::Value(value) => render_value(value),
            Self::Nothing => NO_OUTPUT.to_string(),
        }
    }
}

impl MultiEvalReport {
    pub fn render_text(&self) -> String {
        match self {
            Self::Updated { files } if files.is_empty() => {
                "Evaluation successful, no files were modified or specified for update."
                    .to_string()
            }
            Self::Updated { files } => {
                format!("Successfully updated files: {}", files.join(", "))
            }
            Self::Value(value) => render_value(value),
            Self::Nothing => NO_OUTPUT.to_string(),
        }
    }
}
