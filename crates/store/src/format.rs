//! Pure parse/render for the two on-disk shapes. No I/O happens here.

use crate::error::{Result, StoreError};
use jsontools_protocol::Format;
use serde_json::Value;
use std::path::Path;

/// Detects the format of `raw` and parses it.
///
/// A whole-document parse is tried first. If that fails, every non-blank line is parsed on its
/// own; the first bad line fails the whole read.
pub fn parse(path: &Path, raw: &str) -> Result<(Value, Format)> {
    let document_error = match serde_json::from_str::<Value>(raw) {
        Ok(value) => return Ok((value, Format::Single)),
        Err(err) => err,
    };

    let mut values = Vec::new();
    for (idx, line) in raw.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => values.push(value),
            Err(line_error) => {
                return Err(StoreError::MalformedContent {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    line_error: line_error.to_string(),
                    document_error: document_error.to_string(),
                });
            }
        }
    }
    Ok((Value::Array(values), Format::LineDelimited))
}

/// Serializes `value` in `format`.
///
/// `Single` is pretty-printed with two-space indentation. `LineDelimited` needs an array whose
/// elements are objects or arrays; each becomes one compact line, joined by `\n`.
pub fn render(path: &Path, value: &Value, format: Format) -> Result<String> {
    match format {
        Format::Single => serde_json::to_string_pretty(value).map_err(|err| {
            StoreError::UnsupportedWriteShape {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }),
        Format::LineDelimited => {
            let Value::Array(items) = value else {
                return Err(StoreError::UnsupportedWriteShape {
                    path: path.to_path_buf(),
                    reason: format!(
                        "line-delimited data must be an array, got {}",
                        kind_of(value)
                    ),
                });
            };
            let mut lines = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                if !matches!(item, Value::Object(_) | Value::Array(_)) {
                    return Err(StoreError::UnsupportedWriteShape {
                        path: path.to_path_buf(),
                        reason: format!(
                            "line-delimited element {idx} must be an object or array, got {}",
                            kind_of(item)
                        ),
                    });
                }
                lines.push(item.to_string());
            }
            Ok(lines.join("\n"))
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn p() -> &'static Path {
        Path::new("data.json")
    }

    #[test]
    fn single_document_wins_over_lines() {
        let (value, format) = parse(p(), "{\"a\": [1, 2]}\n").unwrap();
        assert_eq!(format, Format::Single);
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[test]
    fn one_line_scalar_is_single() {
        let (value, format) = parse(p(), "42").unwrap();
        assert_eq!(format, Format::Single);
        assert_eq!(value, json!(42));
    }

    #[test]
    fn ndjson_skips_blank_lines_and_keeps_order() {
        let raw = "{\"id\":1}\n\n   \n{\"id\":2}\r\n{\"id\":3}\n";
        let (value, format) = parse(p(), raw).unwrap();
        assert_eq!(format, Format::LineDelimited);
        assert_eq!(value, json!([{"id": 1}, {"id": 2}, {"id": 3}]));
    }

    #[test]
    fn blank_only_content_is_empty_ndjson() {
        let (value, format) = parse(p(), "\n  \n\t\n").unwrap();
        assert_eq!(format, Format::LineDelimited);
        assert_eq!(value, json!([]));

        let (value, format) = parse(p(), "").unwrap();
        assert_eq!(format, Format::LineDelimited);
        assert_eq!(value, json!([]));
    }

    #[test]
    fn malformed_line_reports_line_and_both_errors() {
        let raw = "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n{\"a\":\n";
        let err = parse(p(), raw).unwrap_err();
        match err {
            StoreError::MalformedContent {
                line,
                line_error,
                document_error,
                ..
            } => {
                assert_eq!(line, 4);
                assert!(!line_error.is_empty());
                assert!(!document_error.is_empty());
                assert_ne!(line_error, document_error);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn render_single_is_pretty() {
        let out = render(p(), &json!({"n": 2}), Format::Single).unwrap();
        assert_eq!(out, "{\n  \"n\": 2\n}");
    }

    #[test]
    fn render_ndjson_one_line_per_element_without_trailing_newline() {
        let out = render(p(), &json!([{"a": 1}, [1, 2]]), Format::LineDelimited).unwrap();
        assert_eq!(out, "{\"a\":1}\n[1,2]");
    }

    #[test]
    fn render_ndjson_rejects_non_array() {
        let err = render(p(), &json!({"a": 1}), Format::LineDelimited).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedWriteShape { .. }));
        assert_eq!(err.code(), "unsupported_write_shape");
    }

    #[test]
    fn render_ndjson_rejects_scalar_and_null_elements() {
        for bad in [json!([{"a": 1}, 3]), json!([null]), json!(["s"])] {
            let err = render(p(), &bad, Format::LineDelimited).unwrap_err();
            assert!(matches!(err, StoreError::UnsupportedWriteShape { .. }));
        }
    }
}
