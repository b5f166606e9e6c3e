use crate::error::{Result, StoreError};
use crate::format;
use jsontools_protocol::Format;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

/// Parsed content of one input file together with the format it was read in.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub value: Value,
    pub format: Format,
}

impl LoadedDocument {
    /// Path as the caller supplied it, for reports.
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads `path`, detecting single-document JSON vs line-delimited JSON.
///
/// Bytes that are not valid UTF-8 are reported as malformed content, pointing at the line
/// holding the first bad byte.
pub async fn read(path: impl AsRef<Path>) -> Result<LoadedDocument> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| StoreError::from_io(path, err))?;
    let raw = String::from_utf8(bytes).map_err(|err| {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        StoreError::MalformedContent {
            path: path.to_path_buf(),
            line: valid.iter().filter(|b| **b == b'\n').count() + 1,
            line_error: err.utf8_error().to_string(),
            document_error: "file is not valid UTF-8".to_string(),
        }
    })?;
    let (value, format) = format::parse(path, &raw)?;
    log::debug!("read {} as {format}", path.display());
    Ok(LoadedDocument {
        path: path.to_path_buf(),
        value,
        format,
    })
}

/// Reads every path concurrently. Output order matches input order.
///
/// Every read runs to completion. When any fail, the failure of the earliest path in input
/// order is returned; no partial set is ever handed back.
pub async fn read_many(paths: &[PathBuf]) -> Result<Vec<LoadedDocument>> {
    let mut join = JoinSet::new();
    for (idx, path) in paths.iter().cloned().enumerate() {
        join.spawn(async move { (idx, read(path).await) });
    }

    let mut slots: Vec<Option<Result<LoadedDocument>>> = Vec::with_capacity(paths.len());
    slots.resize_with(paths.len(), || None);
    while let Some(joined) = join.join_next().await {
        let (idx, result) = joined?;
        slots[idx] = Some(result);
    }

    slots.into_iter().flatten().collect()
}

/// Overwrites `path` with `value` serialized in `format`.
///
/// The whole payload is rendered before the file is opened, so a shape error leaves the
/// previous content untouched.
pub async fn write(path: impl AsRef<Path>, value: &Value, format: Format) -> Result<()> {
    let path = path.as_ref();
    let content = format::render(path, value, format)?;
    write_rendered(path, content).await?;
    log::debug!("wrote {} as {format}", path.display());
    Ok(())
}

/// Overwrites `path` with text already produced by [`render`](crate::render).
pub async fn write_rendered(path: impl AsRef<Path>, content: String) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, content)
        .await
        .map_err(|err| StoreError::from_io(path, err))
}
