use jsontools_protocol::ErrorEnvelope;
use jsontools_store::StoreError;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Error executing provided script: {message}")]
    Script { message: String },

    #[error("Script exceeded the execution budget of {} ms", budget.as_millis())]
    TimeoutExceeded { budget: Duration },

    #[error("Security violation: invalid update directive at position {position}: {reason}")]
    InvalidMutationDirective { position: usize, reason: String },

    #[error("Invalid path expression `{expression}`: {message}")]
    InvalidPath { expression: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Update failed after writing [{}]: {source}", written.join(", "))]
    WriteFailed {
        written: Vec<String>,
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    pub(crate) fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.code(),
            Self::Script { .. } => "script_error",
            Self::TimeoutExceeded { .. } => "timeout_exceeded",
            Self::InvalidMutationDirective { .. } => "invalid_mutation_directive",
            Self::InvalidPath { .. } => "invalid_path",
            Self::InvalidRequest(_) => "invalid_request",
            Self::WriteFailed { .. } => "write_failed",
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.code(), self.to_string());
        match self {
            Self::Store(StoreError::MalformedContent {
                line,
                line_error,
                document_error,
                ..
            }) => envelope.with_details(json!({
                "line": line,
                "line_error": line_error,
                "document_error": document_error,
            })),
            Self::Store(StoreError::NotFound { .. }) => {
                envelope.with_hint("Pass an absolute path; relative paths resolve against the server's working directory.")
            }
            Self::TimeoutExceeded { .. } => envelope
                .with_hint("Long-running loops are stopped at the budget; narrow the data with jp::query first."),
            Self::InvalidMutationDirective { .. } => envelope.with_hint(
                "Each update needs `index` in 0..file_count; no file was written.",
            ),
            Self::WriteFailed { written, .. } => envelope.with_details(json!({ "written": written })),
            _ => envelope,
        }
    }
}
