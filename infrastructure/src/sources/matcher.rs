//! Filter and pipeline evaluation for the in-memory store.
//!
//! Supports the subset of the query language that query tools produce:
//! field equality (dotted paths, array membership), the comparison operators
//! `$eq $ne $gt $gte $lt $lte $in $nin $exists` and the logical operators
//! `$and $or $nor`. Pipelines may use `$match`, `$vectorSearch`, `$sort`,
//! `$skip` and `$limit`. Anything else is rejected the way a real store
//! rejects an unknown operator.

use docquery_application::StoreError;
use docquery_domain::query::get_path;
use docquery_domain::{Document, QueryDocument};
use serde_json::Value;
use std::cmp::Ordering;

/// Whether `document` satisfies `filter`.
pub(crate) fn matches(document: &Document, filter: &QueryDocument) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => all_match(document, clauses(key, condition)?)?,
            "$or" => any_match(document, clauses(key, condition)?)?,
            "$nor" => !any_match(document, clauses(key, condition)?)?,
            op if op.starts_with('$') => {
                return Err(rejected(format!("unknown top level operator: {op}")));
            }
            path => field_matches(get_path(document, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_match(document: &Document, clauses: Vec<&QueryDocument>) -> Result<bool, StoreError> {
    for clause in clauses {
        if !matches(document, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_match(document: &Document, clauses: Vec<&QueryDocument>) -> Result<bool, StoreError> {
    for clause in clauses {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn clauses<'a>(op: &str, condition: &'a Value) -> Result<Vec<&'a QueryDocument>, StoreError> {
    let items = condition
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| rejected(format!("{op} argument must be a non-empty array")))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| rejected(format!("{op} entries must be objects")))
        })
        .collect()
}

fn field_matches(value: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    match condition {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
            for (op, operand) in ops {
                if !operator_matches(value, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(equals_or_contains(value, condition)),
    }
}

fn operator_matches(value: Option<&Value>, op: &str, operand: &Value) -> Result<bool, StoreError> {
    let matched = match op {
        "$eq" => equals_or_contains(value, operand),
        "$ne" => !equals_or_contains(value, operand),
        "$gt" => compare_any(value, operand, |o| o == Ordering::Greater),
        "$gte" => compare_any(value, operand, |o| o != Ordering::Less),
        "$lt" => compare_any(value, operand, |o| o == Ordering::Less),
        "$lte" => compare_any(value, operand, |o| o != Ordering::Greater),
        "$in" => in_list(value, op, operand)?,
        "$nin" => !in_list(value, op, operand)?,
        "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
        other => return Err(rejected(format!("unknown operator: {other}"))),
    };
    Ok(matched)
}

fn in_list(value: Option<&Value>, op: &str, operand: &Value) -> Result<bool, StoreError> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| rejected(format!("{op} needs an array")))?;
    Ok(candidates.iter().any(|c| equals_or_contains(value, c)))
}

/// Equality with array membership; a missing field equals `null`.
fn equals_or_contains(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn compare_any(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare(item, operand).is_some_and(&accept)),
        Some(actual) => compare(actual, operand).is_some_and(accept),
        None => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((kx, vx), (ky, vy))| kx == ky && values_equal(vx, vy))
        }
        _ => a == b,
    }
}

/// Ordering between values of the same type; `None` across types.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Run an aggregation pipeline over a snapshot of a collection.
pub(crate) fn run_pipeline(
    mut documents: Vec<Document>,
    pipeline: &[QueryDocument],
) -> Result<Vec<Document>, StoreError> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(rejected(
                    "a pipeline stage object must contain exactly one field",
                ));
            }
        };

        documents = match name.as_str() {
            "$match" => {
                let filter = spec
                    .as_object()
                    .ok_or_else(|| rejected("the match filter must be an expression in an object"))?;
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if matches(&document, filter)? {
                        kept.push(document);
                    }
                }
                kept
            }
            "$vectorSearch" => vector_search(documents, spec)?,
            "$sort" => sort(documents, spec)?,
            "$skip" => {
                let n = count_arg(name, spec)?;
                documents.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = count_arg(name, spec)?;
                documents.truncate(n);
                documents
            }
            other => {
                return Err(rejected(format!("unrecognized pipeline stage name: '{other}'")));
            }
        };
    }
    Ok(documents)
}

fn count_arg(stage: &str, spec: &Value) -> Result<usize, StoreError> {
    spec.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| rejected(format!("{stage} requires a non-negative integer")))
}

fn sort(mut documents: Vec<Document>, spec: &Value) -> Result<Vec<Document>, StoreError> {
    let keys = spec
        .as_object()
        .filter(|keys| !keys.is_empty())
        .ok_or_else(|| rejected("$sort needs a non-empty object of sort keys"))?;
    let mut order = Vec::with_capacity(keys.len());
    for (path, direction) in keys {
        match direction.as_i64() {
            Some(1) => order.push((path.as_str(), false)),
            Some(-1) => order.push((path.as_str(), true)),
            _ => return Err(rejected(format!("$sort key ordering must be 1 or -1 for '{path}'"))),
        }
    }

    documents.sort_by(|a, b| {
        for (path, descending) in &order {
            let ordering = match (get_path(a, path), get_path(b, path)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(documents)
}

/// Exhaustive cosine-similarity ranking standing in for an ANN index.
fn vector_search(documents: Vec<Document>, spec: &Value) -> Result<Vec<Document>, StoreError> {
    let spec = spec
        .as_object()
        .ok_or_else(|| rejected("$vectorSearch requires an object"))?;
    let path = spec
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| rejected("$vectorSearch.path is required"))?;
    let query = spec
        .get("queryVector")
        .and_then(as_vector)
        .ok_or_else(|| rejected("$vectorSearch.queryVector must be an array of numbers"))?;
    let num_candidates = spec
        .get("numCandidates")
        .and_then(Value::as_u64)
        .ok_or_else(|| rejected("$vectorSearch.numCandidates is required"))?;
    let limit = spec
        .get("limit")
        .and_then(Value::as_u64)
        .ok_or_else(|| rejected("$vectorSearch.limit is required"))?;
    if limit > num_candidates {
        return Err(rejected("$vectorSearch.limit must not exceed numCandidates"));
    }

    let mut scored: Vec<(f64, Document)> = documents
        .into_iter()
        .filter_map(|document| {
            let embedding = get_path(&document, path).and_then(as_vector)?;
            let score = cosine_similarity(&query, &embedding)?;
            Some((score, document))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let keep = usize::try_from(num_candidates.min(limit)).unwrap_or(usize::MAX);
    Ok(scored.into_iter().take(keep).map(|(_, d)| d).collect())
}

fn as_vector(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

fn rejected(reason: impl Into<String>) -> StoreError {
    StoreError::Rejected(reason.into())
}
