//! JSONPath (RFC 9535) selection over loaded values.

use crate::error::{EngineError, Result};
use jsontools_protocol::{Node, PathSegment};
use serde_json::Value;
use serde_json_path::{JsonPath, PathElement};

fn compile(expression: &str) -> Result<JsonPath> {
    JsonPath::parse(expression).map_err(|err| EngineError::InvalidPath {
        expression: expression.to_string(),
        message: err.to_string(),
    })
}

/// `None` and `Some(0)` both mean "no limit".
fn limit(count: Option<usize>) -> usize {
    match count {
        Some(0) | None => usize::MAX,
        Some(n) => n,
    }
}

/// Matched values in document order.
pub fn query(value: &Value, expression: &str, count: Option<usize>) -> Result<Vec<Value>> {
    let path = compile(expression)?;
    Ok(path
        .query(value)
        .all()
        .into_iter()
        .take(limit(count))
        .cloned()
        .collect())
}

/// Matched values with their location, e.g. `["$", "a", 0]`.
pub fn nodes(value: &Value, expression: &str, count: Option<usize>) -> Result<Vec<Node>> {
    let path = compile(expression)?;
    Ok(path
        .query_located(value)
        .iter()
        .take(limit(count))
        .map(|located| {
            let mut segments = vec![PathSegment::Key("$".to_string())];
            segments.extend(located.location().iter().map(|element| match element {
                PathElement::Name(name) => PathSegment::Key(name.to_string()),
                PathElement::Index(index) => PathSegment::Index(*index),
            }));
            Node {
                path: segments,
                value: located.node().clone(),
            }
        })
        .collect())
}
