//! # jsontools engine
//!
//! Path queries and confined script evaluation over JSON / NDJSON files.
//!
//! ## Eval pipeline
//!
//! ```text
//! file(s) ──> store::read ──> sandbox (data = value) ──> final value
//!                                                          │
//!                        ┌─────────────────────────────────┤
//!                        │                                 │
//!              mutation instruction                 anything else
//!                        │                                 │
//!          validate + store::write (same format)     returned as-is
//! ```
//!
//! Scripts are Rhai. They see `data`, the `util` and `jp` helper modules and the core
//! language; there is no file, module, clock or output access.
//!
//! ```no_run
//! use jsontools_engine::{EngineConfig, JsonTools};
//!
//! # async fn demo() -> jsontools_engine::Result<()> {
//! let tools = JsonTools::new(EngineConfig::from_env());
//! let report = tools
//!     .eval("config.json", r#"data.n += 1; #{ "type": "updateFile", "data": data }"#)
//!     .await?;
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

mod config;
mod deep;
mod error;
mod orchestrator;
mod outcome;
mod pathquery;
mod runner;
mod sandbox;

pub use config::{
    EngineConfig, ENV_EVAL_TIMEOUT_MS, ENV_MAX_ARRAY_SIZE, ENV_MAX_CALL_LEVELS, ENV_MAX_EXPR_DEPTH,
    ENV_MAX_MAP_SIZE, ENV_MAX_STRING_SIZE,
};
pub use error::{EngineError, Result};
pub use jsontools_protocol::{EvalReport, Format, MultiEvalReport, Node, PathSegment};
pub use orchestrator::{EvalPhase, JsonTools};
pub use outcome::{
    plan_writes, validate_directives, ScriptOutcome, UpdateDirective, UPDATE_FILE,
    UPDATE_MULTIPLE_FILES,
};
pub use pathquery::{nodes, query};
pub use runner::{execute, run};
pub use sandbox::{DATA_BINDING, JP_MODULE, UTIL_MODULE};
