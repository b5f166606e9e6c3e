use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::outcome::{plan_writes, validate_directives, ScriptOutcome};
use crate::{pathquery, runner};
use jsontools_protocol::{EvalReport, MultiEvalReport, Node};
use jsontools_store::{self as store, LoadedDocument, StoreError};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

/// Lifecycle of one eval invocation, logged at `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalPhase {
    Idle,
    Reading,
    Executing,
    Interpreting,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for EvalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Reading => "reading",
            Self::Executing => "executing",
            Self::Interpreting => "interpreting",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct PhaseLog {
    op: &'static str,
    phase: EvalPhase,
}

impl PhaseLog {
    fn new(op: &'static str) -> Self {
        Self {
            op,
            phase: EvalPhase::Idle,
        }
    }

    fn enter(&mut self, next: EvalPhase) {
        log::debug!("{}: {} -> {}", self.op, self.phase, next);
        self.phase = next;
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.enter(EvalPhase::Done),
            Err(err) => {
                log::debug!("{}: {} -> {} ({})", self.op, self.phase, EvalPhase::Failed, err.code());
                self.phase = EvalPhase::Failed;
            }
        }
        result
    }
}

/// Entry point for the four operations. Holds configuration only; every call is independent.
#[derive(Debug, Clone, Default)]
pub struct JsonTools {
    config: EngineConfig,
}

impl JsonTools {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Values matched by `expression`. Line-delimited files are queried as their array of rows.
    pub async fn query(
        &self,
        path: impl AsRef<Path>,
        expression: &str,
        count: Option<usize>,
    ) -> Result<Vec<Value>> {
        let doc = store::read(path).await?;
        pathquery::query(&doc.value, expression, count)
    }

    /// Like [`JsonTools::query`], with the location of every match.
    pub async fn nodes(
        &self,
        path: impl AsRef<Path>,
        expression: &str,
        count: Option<usize>,
    ) -> Result<Vec<Node>> {
        let doc = store::read(path).await?;
        pathquery::nodes(&doc.value, expression, count)
    }

    /// Runs `code` with the file's content bound to `data`. A final
    /// `#{ type: "updateFile", data: V }` rewrites the file in its original format.
    pub async fn eval(&self, path: impl AsRef<Path>, code: &str) -> Result<EvalReport> {
        let mut phases = PhaseLog::new("eval");
        let result = self.eval_inner(path.as_ref(), code, &mut phases).await;
        phases.finish(result)
    }

    async fn eval_inner(
        &self,
        path: &Path,
        code: &str,
        phases: &mut PhaseLog,
    ) -> Result<EvalReport> {
        phases.enter(EvalPhase::Reading);
        let doc = store::read(path).await?;

        phases.enter(EvalPhase::Executing);
        let value = runner::run(code, doc.value, &self.config).await?;

        phases.enter(EvalPhase::Interpreting);
        match ScriptOutcome::decode(value) {
            ScriptOutcome::UpdateFile { data, .. } => {
                phases.enter(EvalPhase::Writing);
                store::write(&doc.path, &data, doc.format).await?;
                log::info!("updated {} ({})", doc.path.display(), doc.format);
                Ok(EvalReport::Updated {
                    path: doc.path.display().to_string(),
                    format: doc.format,
                })
            }
            other => Ok(other
                .into_value()
                .map(EvalReport::Value)
                .unwrap_or(EvalReport::Nothing)),
        }
    }

    /// Runs `code` with the ordered list of file contents bound to `data`. A final
    /// `#{ type: "updateMultipleFiles", updates: [#{ index, data }] }` rewrites the indicated
    /// files, each in its own original format.
    pub async fn multi_eval(&self, paths: &[PathBuf], code: &str) -> Result<MultiEvalReport> {
        let mut phases = PhaseLog::new("multi_eval");
        let result = self.multi_eval_inner(paths, code, &mut phases).await;
        phases.finish(result)
    }

    async fn multi_eval_inner(
        &self,
        paths: &[PathBuf],
        code: &str,
        phases: &mut PhaseLog,
    ) -> Result<MultiEvalReport> {
        if paths.is_empty() {
            return Err(EngineError::InvalidRequest(
                "at least one file path is required".to_string(),
            ));
        }

        phases.enter(EvalPhase::Reading);
        let docs = store::read_many(paths).await?;
        let input = Value::Array(docs.iter().map(|doc| doc.value.clone()).collect());

        phases.enter(EvalPhase::Executing);
        let value = runner::run(code, input, &self.config).await?;

        phases.enter(EvalPhase::Interpreting);
        match ScriptOutcome::decode(value) {
            ScriptOutcome::UpdateMultipleFiles { updates, .. } => {
                let directives = validate_directives(&updates, docs.len())?;
                let plan = plan_writes(directives);
                phases.enter(EvalPhase::Writing);
                let files = write_all(&docs, plan).await?;
                Ok(MultiEvalReport::Updated { files })
            }
            other => Ok(other
                .into_value()
                .map(MultiEvalReport::Value)
                .unwrap_or(MultiEvalReport::Nothing)),
        }
    }
}

/// Writes every planned file concurrently.
///
/// Every payload is rendered first; a shape error on any of them fails the whole batch
/// before a single file is touched. The writes themselves are independent, so an I/O
/// failure does not cancel the others; the lowest-index failure is reported along with what
/// did get written.
async fn write_all(docs: &[LoadedDocument], plan: Vec<(usize, Value)>) -> Result<Vec<String>> {
    let mut rendered = Vec::with_capacity(plan.len());
    for (index, data) in plan {
        let doc = &docs[index];
        let content = store::render(&doc.path, &data, doc.format)?;
        rendered.push((index, doc.path.clone(), content));
    }

    let mut join = JoinSet::new();
    for (index, path, content) in rendered {
        join.spawn(async move { (index, store::write_rendered(&path, content).await) });
    }

    let mut written = Vec::new();
    let mut failures: Vec<(usize, StoreError)> = Vec::new();
    while let Some(joined) = join.join_next().await {
        let (index, result) = joined.map_err(StoreError::from)?;
        match result {
            Ok(()) => written.push(index),
            Err(err) => failures.push((index, err)),
        }
    }

    written.sort_unstable();
    let written: Vec<String> = written
        .into_iter()
        .map(|index| docs[index].display_path())
        .collect();

    failures.sort_by_key(|(index, _)| *index);
    match failures.into_iter().next() {
        Some((_, source)) => Err(EngineError::WriteFailed { written, source }),
        None => {
            log::info!("updated {} file(s)", written.len());
            Ok(written)
        }
    }
}
