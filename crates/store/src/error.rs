use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Invalid line-delimited content in file: {} on line {line}. Error: {line_error}. Original JSON parse error: {document_error}",
        path.display()
    )]
    MalformedContent {
        path: PathBuf,
        line: usize,
        line_error: String,
        document_error: String,
    },

    #[error("Cannot write {}: {reason}", path.display())]
    UnsupportedWriteShape { path: PathBuf, reason: String },

    #[error("Background file task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Stable snake_case identifier for envelopes and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Io { .. } | Self::Join(_) => "io_failure",
            Self::MalformedContent { .. } => "malformed_content",
            Self::UnsupportedWriteShape { .. } => "unsupported_write_shape",
        }
    }
}
