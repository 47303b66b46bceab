//! Path Query Evaluator
//!
//! Matches records against a dot-separated field path, a string comparison
//! operator and a target value. Records are first serialized into a generic
//! `serde_json::Value` tree so the evaluator never touches typed fields.
//!
//! # Traversal
//!
//! - An object descends into the value under the next path segment.
//! - An array does not consume a segment: it resolves to the first element
//!   that can reach the next segment, and traversal continues there.
//! - Anything else, or a missing key, makes the path absent.
//!
//! An absent path (or a `null` leaf) is a non-match, never an error. A
//! resolved leaf that is not a string is a validation error.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// String comparison applied to the resolved leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equals,
    Prefix,
    Suffix,
    Contains,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Equals => "equals",
            FilterOp::Prefix => "prefix",
            FilterOp::Suffix => "suffix",
            FilterOp::Contains => "contains",
        }
    }

    /// Apply the comparison; case-sensitive.
    pub fn compare(&self, candidate: &str, value: &str) -> bool {
        match self {
            FilterOp::Equals => candidate == value,
            FilterOp::Prefix => candidate.starts_with(value),
            FilterOp::Suffix => candidate.ends_with(value),
            FilterOp::Contains => candidate.contains(value),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equals" => Ok(FilterOp::Equals),
            "prefix" => Ok(FilterOp::Prefix),
            "suffix" => Ok(FilterOp::Suffix),
            "contains" => Ok(FilterOp::Contains),
            other => Err(Error::Validation(format!(
                "unknown filter operation {:?}",
                other
            ))),
        }
    }
}

/// A parsed `path op value` query, reusable across many records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    segments: Vec<String>,
    op: FilterOp,
    value: String,
}

impl PathQuery {
    /// Parse a query; fails only on an unknown operator.
    pub fn parse(path: &str, op: &str, value: &str) -> Result<Self> {
        Ok(Self {
            segments: path.split('.').map(str::to_owned).collect(),
            op: op.parse()?,
            value: value.to_owned(),
        })
    }

    /// Serialize `record` and evaluate the query against it.
    pub fn matches<T: Serialize>(&self, record: &T) -> Result<bool> {
        let tree = serde_json::to_value(record)?;
        self.matches_value(&tree)
    }

    /// Evaluate the query against an already generic tree.
    pub fn matches_value(&self, tree: &Value) -> Result<bool> {
        match resolve(tree, &self.segments) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::String(candidate)) => Ok(self.op.compare(candidate, &self.value)),
            Some(other) => Err(Error::Validation(format!(
                "path {} resolves to a non-string value ({})",
                self.segments.join("."),
                kind_of(other)
            ))),
        }
    }
}

/// One-shot form of [`PathQuery::parse`] followed by [`PathQuery::matches`].
pub fn matches<T: Serialize>(record: &T, path: &str, op: &str, value: &str) -> Result<bool> {
    PathQuery::parse(path, op, value)?.matches(record)
}

/// Walk `path` down from `node`.
pub fn resolve<'a>(node: &'a Value, path: &[String]) -> Option<&'a Value> {
    let Some(head) = path.first() else {
        return Some(node);
    };

    match node {
        Value::Object(map) => map.get(head).and_then(|child| resolve(child, &path[1..])),
        Value::Array(items) => items
            .iter()
            .find(|item| reaches(item, head))
            .and_then(|item| resolve(item, path)),
        _ => None,
    }
}

/// Whether `key` is reachable as an object key from `node`, looking through arrays.
fn reaches(node: &Value, key: &str) -> bool {
    match node {
        Value::Object(map) => map.contains_key(key),
        Value::Array(items) => items.iter().any(|item| reaches(item, key)),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Tests
// =============================================================================
