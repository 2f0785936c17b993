//! The JSON Comparator: recursively diffs two decoded responses.
//!
//! Structured around `serde_json::Value`, following the same idioms used
//! throughout the crate's config loading (`models::settings`), with a
//! recursive algorithm built around a dedicated result type.
//!
//! Two deliberate design choices:
//! - **Leaf-only field counting**: only scalars and type-mismatched nodes
//!   contribute to `total_fields`/`matched_fields`. A container (object or
//!   array) that recurses cleanly doesn't also count itself, avoiding the
//!   double-count-of-ancestors ambiguity that arises from naively
//!   incrementing counters at every level of recursion.
//! - **Array cap of 10** (`ARRAY_COMPARE_CAP`): a fixed constant, not a
//!   configuration knob, matching "not specified" by picking the simplest
//!   option.

use crate::models::comparison::{DiffKind, ResponseDiff};
use crate::models::orchestration_rule::ComparisonConfig;
use serde_json::Value;

/// Array elements beyond this index are never compared; a deliberate
/// truncation the caller must be aware of.
pub const ARRAY_COMPARE_CAP: usize = 10;

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub match_rate: f64,
    pub diffs: Vec<ResponseDiff>,
    pub total_fields: u64,
    pub matched_fields: u64,
}

pub struct Comparator;

impl Comparator {
    /// Compares two response bodies. An empty body is treated as JSON
    /// `null`; a body that fails to parse yields a single `TypeMismatch`
    /// diff at the synthetic path `"<side>.body"` and compares as `null`
    /// against the other side for every other field.
    pub fn compare(legacy_body: &[u8], modern_body: &[u8], config: &ComparisonConfig) -> ComparisonResult {
        let mut diffs = Vec::new();

        let legacy_value = Self::parse_or_null(legacy_body, "legacy", &mut diffs);
        let modern_value = Self::parse_or_null(modern_body, "modern", &mut diffs);

        let mut total_fields = 0u64;
        let mut matched_fields = 0u64;

        compare_value(
            &legacy_value,
            &modern_value,
            "",
            config,
            &mut diffs,
            &mut total_fields,
            &mut matched_fields,
        );

        let match_rate = if total_fields == 0 {
            1.0
        } else {
            matched_fields as f64 / total_fields as f64
        };

        ComparisonResult {
            match_rate,
            diffs,
            total_fields,
            matched_fields,
        }
    }

    fn parse_or_null(body: &[u8], side: &str, diffs: &mut Vec<ResponseDiff>) -> Value {
        if body.is_empty() {
            return Value::Null;
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => value,
            Err(e) => {
                diffs.push(ResponseDiff {
                    kind: DiffKind::TypeMismatch,
                    path: format!("{}.body", side),
                    legacy_value: None,
                    modern_value: None,
                    message: format!("{} response body is not valid json: {}", side, e),
                });
                Value::Null
            }
        }
    }
}

fn is_ignored(path: &str, config: &ComparisonConfig) -> bool {
    !path.is_empty() && config.ignore_fields.iter().any(|f| path.contains(f.as_str()))
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

fn as_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[allow(clippy::too_many_arguments)]
fn compare_value(
    legacy: &Value,
    modern: &Value,
    path: &str,
    config: &ComparisonConfig,
    diffs: &mut Vec<ResponseDiff>,
    total: &mut u64,
    matched: &mut u64,
) {
    if is_ignored(path, config) {
        return;
    }

    match (legacy, modern) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = child_path(path, key);
                match (a.get(key), b.get(key)) {
                    (None, Some(modern_child)) => {
                        if is_ignored(&child, config) {
                            continue;
                        }
                        *total += 1;
                        diffs.push(ResponseDiff {
                            kind: DiffKind::Missing,
                            path: child,
                            legacy_value: None,
                            modern_value: Some(modern_child.clone()),
                            message: format!("field '{}' is present in modern but missing in legacy", key),
                        });
                    }
                    (Some(legacy_child), None) => {
                        if is_ignored(&child, config) {
                            continue;
                        }
                        *total += 1;
                        diffs.push(ResponseDiff {
                            kind: DiffKind::Extra,
                            path: child,
                            legacy_value: Some(legacy_child.clone()),
                            modern_value: None,
                            message: format!("field '{}' is present in legacy but missing in modern", key),
                        });
                    }
                    (Some(legacy_child), Some(modern_child)) => {
                        compare_value(legacy_child, modern_child, &child, config, diffs, total, matched);
                    }
                    (None, None) => unreachable!("key came from the union of both maps"),
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                *total += 1;
                diffs.push(ResponseDiff {
                    kind: DiffKind::ValueMismatch,
                    path: path.to_string(),
                    legacy_value: Some(Value::from(a.len())),
                    modern_value: Some(Value::from(b.len())),
                    message: format!("array length differs: legacy={}, modern={}", a.len(), b.len()),
                });
            } else {
                *matched += 0; // length match contributes nothing by itself; elements still compare below
            }
            let compare_len = a.len().min(b.len()).min(ARRAY_COMPARE_CAP);
            for i in 0..compare_len {
                let child = index_path(path, i);
                compare_value(&a[i], &b[i], &child, config, diffs, total, matched);
            }
        }
        _ => {
            if type_name(legacy) != type_name(modern) && !config.strict_mode {
                if let (Some(a), Some(b)) = (as_numeric(legacy), as_numeric(modern)) {
                    *total += 1;
                    if (a - b).abs() <= config.allowable_difference {
                        *matched += 1;
                    } else {
                        diffs.push(ResponseDiff {
                            kind: DiffKind::ValueMismatch,
                            path: path.to_string(),
                            legacy_value: Some(legacy.clone()),
                            modern_value: Some(modern.clone()),
                            message: format!("numeric values differ beyond tolerance at '{}'", path),
                        });
                    }
                    return;
                }
            }

            if type_name(legacy) != type_name(modern) {
                *total += 1;
                diffs.push(ResponseDiff {
                    kind: DiffKind::TypeMismatch,
                    path: path.to_string(),
                    legacy_value: Some(legacy.clone()),
                    modern_value: Some(modern.clone()),
                    message: format!(
                        "type mismatch at '{}': legacy is {}, modern is {}",
                        path,
                        type_name(legacy),
                        type_name(modern)
                    ),
                });
                return;
            }

            *total += 1;
            let equal = match (legacy, modern) {
                (Value::Null, Value::Null) => true,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Number(_), Value::Number(_)) => {
                    let (a, b) = (as_numeric(legacy).unwrap(), as_numeric(modern).unwrap());
                    (a - b).abs() <= config.allowable_difference
                }
                (Value::String(a), Value::String(b)) => {
                    if config.strict_mode {
                        a == b
                    } else if let (Some(na), Some(nb)) = (a.parse::<f64>().ok(), b.parse::<f64>().ok()) {
                        (na - nb).abs() <= config.allowable_difference
                    } else {
                        a == b
                    }
                }
                _ => false,
            };

            if equal {
                *matched += 1;
            } else {
                diffs.push(ResponseDiff {
                    kind: DiffKind::ValueMismatch,
                    path: path.to_string(),
                    legacy_value: Some(legacy.clone()),
                    modern_value: Some(modern.clone()),
                    message: format!("value mismatch at '{}'", path),
                });
            }
        }
    }
}
