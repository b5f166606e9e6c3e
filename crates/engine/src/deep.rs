//! Deep helpers over JSON values, exposed to scripts as the `util` module.
//!
//! Property paths use dotted/bracket notation: `a.b[0].c`, `a.b.0`, `a["odd key"]`.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Splits a property path into segments. Malformed brackets are kept as literal keys.
pub fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    let flush = |current: &mut String, segments: &mut Vec<Segment>| {
        if !current.is_empty() {
            segments.push(Segment::Key(std::mem::take(current)));
        }
    };

    while let Some(ch) = chars.next() {
        match ch {
            '.' => flush(&mut current, &mut segments),
            '[' => {
                flush(&mut current, &mut segments);
                let mut inner = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(next);
                }
                if !closed {
                    current.push('[');
                    current.push_str(&inner);
                    continue;
                }
                let trimmed = inner.trim();
                let unquoted = trimmed
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
                match unquoted {
                    Some(key) => segments.push(Segment::Key(key.to_string())),
                    None => match trimmed.parse::<usize>() {
                        Ok(index) => segments.push(Segment::Index(index)),
                        Err(_) => segments.push(Segment::Key(trimmed.to_string())),
                    },
                }
            }
            other => current.push(other),
        }
    }
    flush(&mut current, &mut segments);
    segments
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        (Value::Array(items), Segment::Key(key)) => {
            key.parse::<usize>().ok().and_then(|index| items.get(index))
        }
        _ => None,
    }
}

pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .iter()
        .try_fold(value, |current, segment| step(current, segment))
}

pub fn has(value: &Value, path: &str) -> bool {
    get(value, path).is_some()
}

/// Returns a copy of `value` with `new` stored at `path`, creating containers as needed.
///
/// Arrays are padded with `null` up to the target index; an index at or beyond `max_len`
/// is refused.
pub fn set(value: &Value, path: &str, new: Value, max_len: usize) -> Result<Value, String> {
    let segments = parse_path(path);
    if segments.is_empty() {
        return Ok(new);
    }
    let mut out = value.clone();
    set_in(&mut out, &segments, new, max_len)?;
    Ok(out)
}

fn grow(items: &mut Vec<Value>, index: usize, max_len: usize) -> Result<(), String> {
    if index >= max_len {
        return Err(format!(
            "array index {index} exceeds the array size limit of {max_len}"
        ));
    }
    if items.len() <= index {
        items.resize(index + 1, Value::Null);
    }
    Ok(())
}

fn set_in(
    target: &mut Value,
    segments: &[Segment],
    new: Value,
    max_len: usize,
) -> Result<(), String> {
    let Some((head, rest)) = segments.split_first() else {
        *target = new;
        return Ok(());
    };

    if !matches!(target, Value::Object(_) | Value::Array(_)) {
        *target = match head {
            Segment::Index(_) => Value::Array(Vec::new()),
            Segment::Key(_) => Value::Object(Map::new()),
        };
    }

    let slot = match (target, head) {
        (Value::Array(items), Segment::Index(index)) => {
            grow(items, *index, max_len)?;
            &mut items[*index]
        }
        (Value::Array(items), Segment::Key(key)) => match key.parse::<usize>() {
            Ok(index) => {
                grow(items, index, max_len)?;
                &mut items[index]
            }
            // Arrays have no named slots; drop the write.
            Err(_) => return Ok(()),
        },
        (Value::Object(map), Segment::Key(key)) => map.entry(key.clone()).or_insert(Value::Null),
        (Value::Object(map), Segment::Index(index)) => {
            map.entry(index.to_string()).or_insert(Value::Null)
        }
        _ => return Ok(()),
    };
    set_in(slot, rest, new, max_len)
}

/// Returns a copy of `value` with the entry at `path` removed.
pub fn unset(value: &Value, path: &str) -> Value {
    let mut out = value.clone();
    let segments = parse_path(path);
    if let Some((last, parents)) = segments.split_last() {
        let mut cursor = Some(&mut out);
        for segment in parents {
            cursor = cursor.and_then(|current| match (current, segment) {
                (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
                (Value::Object(map), Segment::Index(index)) => map.get_mut(&index.to_string()),
                (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
                _ => None,
            });
        }
        match (cursor, last) {
            (Some(Value::Object(map)), Segment::Key(key)) => {
                map.remove(key);
            }
            (Some(Value::Object(map)), Segment::Index(index)) => {
                map.remove(&index.to_string());
            }
            (Some(Value::Array(items)), Segment::Index(index)) if *index < items.len() => {
                items.remove(*index);
            }
            _ => {}
        }
    }
    out
}

/// Recursive merge: objects merge key by key, anything else in `overlay` replaces `base`.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(left), Value::Object(right)) => {
            let mut out = left.clone();
            for (key, value) in right {
                let merged = match out.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (_, overlay) => overlay.clone(),
    }
}

pub fn pick(value: &Value, keys: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            keys.iter()
                .filter_map(|key| map.get(key).map(|v| (key.clone(), v.clone())))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}

pub fn omit(value: &Value, keys: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !keys.contains(key))
                .map(|(key, v)| (key.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub fn keys(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
        Value::Array(items) => (0..items.len()).map(|i| Value::String(i.to_string())).collect(),
        _ => Vec::new(),
    }
}

pub fn values(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(map) => map.values().cloned().collect(),
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// First occurrence wins.
pub fn uniq(items: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

pub fn flatten(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .flat_map(|item| match item {
            Value::Array(inner) => inner.clone(),
            other => vec![other.clone()],
        })
        .collect()
}

pub fn flatten_deep(items: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) => out.extend(flatten_deep(inner)),
            other => out.push(other.clone()),
        }
    }
    out
}

pub fn chunk(items: &[Value], size: usize) -> Vec<Value> {
    items
        .chunks(size.max(1))
        .map(|c| Value::Array(c.to_vec()))
        .collect()
}

/// Sums numeric elements; non-numbers are ignored. Stays integral while every term is.
pub fn sum(items: &[Value]) -> Value {
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut integral = true;
    for item in items {
        let Value::Number(n) = item else { continue };
        float_total += n.as_f64().unwrap_or(0.0);
        match n.as_i64().and_then(|i| int_total.checked_add(i)) {
            Some(total) if integral => int_total = total,
            _ => integral = false,
        }
    }
    if integral {
        Value::from(int_total)
    } else {
        serde_json::Number::from_f64(float_total)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used by `sort_by`: null < bool < number < string < array < object.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Stable sort by the value found at `path` in each element; missing sorts first.
pub fn sort_by(items: &[Value], path: &str) -> Vec<Value> {
    let mut out = items.to_vec();
    out.sort_by(|a, b| {
        let left = get(a, path).unwrap_or(&Value::Null);
        let right = get(b, path).unwrap_or(&Value::Null);
        compare(left, right)
    });
    out
}

fn group_key(item: &Value, path: &str) -> String {
    match get(item, path) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    }
}

pub fn group_by(items: &[Value], path: &str) -> Value {
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for item in items {
        groups
            .entry(group_key(item, path))
            .or_default()
            .push(item.clone());
    }
    Value::Object(
        groups
            .into_iter()
            .map(|(key, members)| (key, Value::Array(members)))
            .collect(),
    )
}

pub fn count_by(items: &[Value], path: &str) -> Value {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for item in items {
        *counts.entry(group_key(item, path)).or_default() += 1;
    }
    Value::Object(
        counts
            .into_iter()
            .map(|(key, count)| (key, Value::from(count)))
            .collect(),
    )
}

/// Last element with a given key wins.
pub fn key_by(items: &[Value], path: &str) -> Value {
    let mut out = Map::new();
    for item in items {
        out.insert(group_key(item, path), item.clone());
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn path_parsing_handles_dots_brackets_and_quotes() {
        assert_eq!(
            parse_path("a.b[0]['c d'].e"),
            vec![
                Segment::Key("a".into()),
                Segment::Key("b".into()),
                Segment::Index(0),
                Segment::Key("c d".into()),
                Segment::Key("e".into()),
            ]
        );
        assert!(parse_path("").is_empty());
    }

    #[test]
    fn get_walks_objects_and_arrays() {
        let doc = json!({"a": {"b": [10, {"c": true}]}});
        assert_eq!(get(&doc, "a.b[1].c"), Some(&json!(true)));
        assert_eq!(get(&doc, "a.b.0"), Some(&json!(10)));
        assert_eq!(get(&doc, "a.x"), None);
        assert!(has(&doc, "a.b"));
    }

    #[test]
    fn set_creates_intermediate_containers() {
        let out = set(&json!({}), "a.list[2].name", json!("z"), 16).unwrap();
        assert_eq!(out, json!({"a": {"list": [null, null, {"name": "z"}]}}));
    }

    #[test]
    fn set_refuses_to_grow_past_the_limit() {
        let err = set(&json!({"a": []}), "a[99999999999999]", json!(1), 1024).unwrap_err();
        assert!(err.contains("array size limit"), "{err}");
        assert!(set(&json!([]), &format!("[{}]", usize::MAX), json!(1), 1024).is_err());
        assert!(set(&json!({"a": [1]}), "a.5", json!(1), 1024).is_ok());
    }

    #[test]
    fn unset_removes_keys_and_indices() {
        let doc = json!({"a": {"b": 1, "c": [1, 2, 3]}});
        assert_eq!(unset(&doc, "a.b"), json!({"a": {"c": [1, 2, 3]}}));
        assert_eq!(unset(&doc, "a.c[1]"), json!({"a": {"b": 1, "c": [1, 3]}}));
        assert_eq!(unset(&doc, "nope.x"), doc);
    }

    #[test]
    fn merge_is_recursive_for_objects_only() {
        let out = merge(
            &json!({"a": {"x": 1, "y": 2}, "l": [1, 2]}),
            &json!({"a": {"y": 3}, "l": [9]}),
        );
        assert_eq!(out, json!({"a": {"x": 1, "y": 3}, "l": [9]}));
    }

    #[test]
    fn collection_helpers() {
        assert_eq!(uniq(&[json!(1), json!(2), json!(1)]), vec![json!(1), json!(2)]);
        assert_eq!(
            flatten_deep(&[json!(1), json!([2, [3, [4]]])]),
            vec![json!(1), json!(2), json!(3), json!(4)]
        );
        assert_eq!(flatten(&[json!([1, [2]])]), vec![json!(1), json!([2])]);
        assert_eq!(
            chunk(&[json!(1), json!(2), json!(3)], 2),
            vec![json!([1, 2]), json!([3])]
        );
        assert_eq!(sum(&[json!(1), json!(2), json!("x")]), json!(3));
        assert_eq!(sum(&[json!(1), json!(0.5)]), json!(1.5));
    }

    #[test]
    fn grouping_helpers() {
        let rows = [
            json!({"k": "a", "n": 3}),
            json!({"k": "b", "n": 1}),
            json!({"k": "a", "n": 2}),
        ];
        assert_eq!(
            count_by(&rows, "k"),
            json!({"a": 2, "b": 1})
        );
        assert_eq!(group_by(&rows, "k")["a"].as_array().map(Vec::len), Some(2));
        assert_eq!(key_by(&rows, "k")["a"]["n"], json!(2));
        let sorted = sort_by(&rows, "n");
        assert_eq!(
            sorted.iter().map(|r| r["n"].clone()).collect::<Vec<_>>(),
            vec![json!(1), json!(2), json!(3)]
        );
    }

    #[test]
    fn pick_and_omit() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        let keys = vec!["a".to_string(), "c".to_string()];
        assert_eq!(pick(&doc, &keys), json!({"a": 1, "c": 3}));
        assert_eq!(omit(&doc, &keys), json!({"b": 2}));
    }
}
