//! Classification of a script's final value.
//!
//! A map tagged `type: "updateFile"` or `type: "updateMultipleFiles"` is a mutation
//! instruction; everything else is passed through to the caller.

use crate::error::{EngineError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const UPDATE_FILE: &str = "updateFile";
pub const UPDATE_MULTIPLE_FILES: &str = "updateMultipleFiles";

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// `#{ type: "updateFile", data: V }`. `rest` keeps the other keys for pass-through.
    UpdateFile {
        data: Value,
        rest: Map<String, Value>,
    },
    /// `#{ type: "updateMultipleFiles", updates: [..] }`; directives are validated separately
    /// because validity depends on how many files were loaded.
    UpdateMultipleFiles {
        updates: Vec<Value>,
        rest: Map<String, Value>,
    },
    /// Any other map or array.
    Structured(Value),
    /// String, number, bool or null.
    Primitive(Value),
    /// The script ended in `()`.
    Nothing,
}

impl ScriptOutcome {
    pub fn decode(value: Option<Value>) -> Self {
        let Some(value) = value else {
            return Self::Nothing;
        };
        match value {
            Value::Object(map) => Self::decode_object(map),
            Value::Array(_) => Self::Structured(value),
            other => Self::Primitive(other),
        }
    }

    fn decode_object(mut map: Map<String, Value>) -> Self {
        let tag = map.get("type").and_then(Value::as_str).map(str::to_owned);
        match tag.as_deref() {
            Some(UPDATE_FILE) if map.contains_key("data") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                Self::UpdateFile { data, rest: map }
            }
            Some(UPDATE_MULTIPLE_FILES) if map.get("updates").is_some_and(Value::is_array) => {
                match map.remove("updates") {
                    Some(Value::Array(updates)) => Self::UpdateMultipleFiles { updates, rest: map },
                    _ => Self::Structured(Value::Object(map)),
                }
            }
            _ => Self::Structured(Value::Object(map)),
        }
    }

    /// Reconstructs the value the script produced, for pass-through rendering.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::UpdateFile { data, mut rest } => {
                rest.insert("data".into(), data);
                Some(Value::Object(rest))
            }
            Self::UpdateMultipleFiles { updates, mut rest } => {
                rest.insert("updates".into(), Value::Array(updates));
                Some(Value::Object(rest))
            }
            Self::Structured(value) | Self::Primitive(value) => Some(value),
            Self::Nothing => None,
        }
    }
}

/// One validated element of a multi-file instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDirective {
    pub index: usize,
    /// `None` when the directive had no `data` key; such directives are skipped.
    pub data: Option<Value>,
}

/// Validates every directive against `file_count`. One bad directive rejects the whole batch.
pub fn validate_directives(updates: &[Value], file_count: usize) -> Result<Vec<UpdateDirective>> {
    updates
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let invalid = |reason: String| EngineError::InvalidMutationDirective { position, reason };
            let Value::Object(map) = raw else {
                return Err(invalid(format!("directive must be a map, got {raw}")));
            };
            let index = match map.get("index") {
                Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                    invalid(format!("index {n} is not a non-negative integer"))
                })?,
                Some(other) => return Err(invalid(format!("index {other} is not a number"))),
                None => return Err(invalid("index is missing".to_string())),
            };
            let index = usize::try_from(index)
                .ok()
                .filter(|i| *i < file_count)
                .ok_or_else(|| {
                    invalid(format!(
                        "index {index} is out of range for {file_count} file(s)"
                    ))
                })?;
            Ok(UpdateDirective {
                index,
                data: map.get("data").cloned(),
            })
        })
        .collect()
}

/// Collapses validated directives into at most one write per file, last directive winning.
/// Directives without data are dropped here. Output is ordered by file index.
pub fn plan_writes(directives: Vec<UpdateDirective>) -> Vec<(usize, Value)> {
    let mut plan = BTreeMap::new();
    for directive in directives {
        match directive.data {
            Some(data) => {
                plan.insert(directive.index, data);
            }
            None => log::warn!(
                "update directive for file index {} has no data; skipping",
                directive.index
            ),
        }
    }
    plan.into_iter().collect()
}
