//! # jsontools store
//!
//! Reads JSON and newline-delimited JSON files, remembering which shape each file had, and
//! writes values back in that same shape.
//!
//! ```no_run
//! # async fn demo() -> jsontools_store::Result<()> {
//! let doc = jsontools_store::read("events.ndjson").await?;
//! jsontools_store::write(&doc.path, &doc.value, doc.format).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod format;
mod store;

pub use error::{Result, StoreError};
pub use format::{parse, render};
pub use jsontools_protocol::Format;
pub use store::{read, read_many, write, write_rendered, LoadedDocument};
