// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Query constraints for live reads.
//!
//! A [`Query`] is a validated list of [`QueryConstraint`]s:
//!
//! ```text
//! Filter  { field, op, value }   status == "active", capacity >= 10
//! OrderBy { field, direction }   order by plate desc
//! Limit   { n }                  first n records
//! ```
//!
//! Constraints are validated before they reach a store, and the same
//! evaluation ([`Query::apply`]) is used by the in-memory store, the local
//! cache, and the document server so all three agree on results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::document::Record;
use crate::error::{Error, Result};

/// Maximum number of candidates accepted by an `in` filter.
pub const MAX_IN_VALUES: usize = 30;

/// Comparison operators for filter constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "array-contains")]
    ArrayContains,
}

impl FilterOp {
    /// Returns the operator's symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::In => "in",
            FilterOp::ArrayContains => "array-contains",
        }
    }

    /// Returns true for inequality operators, which may only target one field
    /// per query.
    pub fn is_inequality(self) -> bool {
        matches!(self, FilterOp::Ne | FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge)
    }

    /// Returns valid operator symbols for error messages.
    pub fn valid_symbols() -> &'static str {
        "==, !=, <, <=, >, >=, in, array-contains"
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Sort direction for order-by constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One constraint of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryConstraint {
    /// Keep records whose `field` compares to `value` under `op`.
    Filter { field: String, op: FilterOp, value: Value },
    /// Sort by `field`; records lacking the field are excluded.
    OrderBy { field: String, direction: Direction },
    /// Keep at most `n` records.
    Limit { n: usize },
}

impl QueryConstraint {
    /// Creates a filter constraint.
    pub fn filter(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        QueryConstraint::Filter { field: field.into(), op, value: value.into() }
    }

    /// Creates an order-by constraint.
    pub fn order_by(field: impl Into<String>, direction: Direction) -> Self {
        QueryConstraint::OrderBy { field: field.into(), direction }
    }

    /// Creates a limit constraint.
    pub fn limit(n: usize) -> Self {
        QueryConstraint::Limit { n }
    }
}

impl fmt::Display for QueryConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryConstraint::Filter { field, op, value } => write!(f, "{field} {op} {value}"),
            QueryConstraint::OrderBy { field, direction: Direction::Asc } => write!(f, "order by {field}"),
            QueryConstraint::OrderBy { field, direction: Direction::Desc } => {
                write!(f, "order by {field} desc")
            }
            QueryConstraint::Limit { n } => write!(f, "limit {n}"),
        }
    }
}

/// A validated list of constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    constraints: Vec<QueryConstraint>,
}

impl Query {
    /// Builds a query, validating the constraints.
    pub fn new(constraints: Vec<QueryConstraint>) -> Result<Self> {
        let query = Query { constraints };
        query.validate()?;
        Ok(query)
    }

    /// A query matching every document of a collection.
    pub fn all() -> Self {
        Query::default()
    }

    /// Returns the constraints in the order they were given.
    pub fn constraints(&self) -> &[QueryConstraint] {
        &self.constraints
    }

    /// Returns true if the query has no constraints.
    pub fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Checks the constraints.
    ///
    /// Queries received over the wire are deserialized without validation and
    /// must be checked with this before use.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidQuery(msg));
        let mut inequality_field: Option<&str> = None;
        let mut ordered: HashSet<&str> = HashSet::new();
        let mut saw_limit = false;

        for constraint in &self.constraints {
            match constraint {
                QueryConstraint::Filter { field, op, value } => {
                    if field.trim().is_empty() {
                        return invalid(format!("filter '{op}' has an empty field name"));
                    }
                    if *op == FilterOp::In {
                        match value {
                            Value::Array(values) if values.is_empty() => {
                                return invalid(format!("'in' filter on '{field}' needs at least one value"));
                            }
                            Value::Array(values) if values.len() > MAX_IN_VALUES => {
                                return invalid(format!(
                                    "'in' filter on '{field}' accepts at most {MAX_IN_VALUES} values"
                                ));
                            }
                            Value::Array(_) => {}
                            _ => return invalid(format!("'in' filter on '{field}' needs an array value")),
                        }
                    }
                    if op.is_inequality() {
                        match inequality_field {
                            Some(existing) if existing != field.as_str() => {
                                return invalid(format!(
                                    "inequality filters on '{existing}' and '{field}': only one field may use <, <=, >, >=, !="
                                ));
                            }
                            _ => inequality_field = Some(field.as_str()),
                        }
                    }
                }
                QueryConstraint::OrderBy { field, .. } => {
                    if field.trim().is_empty() {
                        return invalid("order by has an empty field name".to_string());
                    }
                    if !ordered.insert(field.as_str()) {
                        return invalid(format!("'{field}' is ordered by more than once"));
                    }
                }
                QueryConstraint::Limit { n } => {
                    if *n == 0 {
                        return invalid("limit must be positive".to_string());
                    }
                    if saw_limit {
                        return invalid("only one limit is allowed".to_string());
                    }
                    saw_limit = true;
                }
            }
        }
        Ok(())
    }

    /// Returns the limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.constraints.iter().find_map(|c| match c {
            QueryConstraint::Limit { n } => Some(*n),
            _ => None,
        })
    }

    /// Returns true if `record` passes every filter and has every ordered field.
    pub fn matches(&self, record: &Record) -> bool {
        self.constraints.iter().all(|c| match c {
            QueryConstraint::Filter { field, op, value } => {
                field_value(record, field).is_some_and(|actual| compare(&actual, *op, value))
            }
            QueryConstraint::OrderBy { field, .. } => field_value(record, field).is_some(),
            QueryConstraint::Limit { .. } => true,
        })
    }

    /// Filters, sorts and truncates `records`.
    ///
    /// Records are sorted by the order-by constraints in sequence, then by id.
    pub fn apply(&self, records: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let mut out: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        let orderings: Vec<(&str, Direction)> = self
            .constraints
            .iter()
            .filter_map(|c| match c {
                QueryConstraint::OrderBy { field, direction } => Some((field.as_str(), *direction)),
                _ => None,
            })
            .collect();

        out.sort_by(|a, b| {
            for (field, direction) in &orderings {
                let ordering = match (field_value(a, field), field_value(b, field)) {
                    (Some(x), Some(y)) => total_cmp(&x, &y),
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                };
                let ordering = match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.id.cmp(&b.id)
        });

        if let Some(n) = self.limit() {
            out.truncate(n);
        }
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            return f.write_str("all");
        }
        let parts: Vec<String> = self.constraints.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Parse a filter expression like `status == active` or `capacity>=10`.
///
/// The field is the leading token and the operator must follow it
/// directly, so operator text inside the value is left alone. The value
/// is read as JSON when it parses as JSON (`10`, `true`, `["a","b"]`,
/// `"quoted"`), otherwise as a plain string.
pub fn parse_filter(input: &str) -> Result<QueryConstraint> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidQuery("empty filter expression".to_string()));
    }

    let field_end = input
        .find(|c: char| c.is_whitespace() || OPERATOR_CHARS.contains(&c))
        .unwrap_or(input.len());
    let (field, rest) = input.split_at(field_end);
    let rest = rest.trim_start();

    match split_operator(rest) {
        Some((op, value)) => build_filter(input, field, op, value),
        None if rest.starts_with(&OPERATOR_CHARS[..]) => Err(Error::InvalidQuery(format!(
            "unknown operator in \"{input}\"; valid operators: {}",
            FilterOp::valid_symbols()
        ))),
        None => Err(Error::InvalidQuery(format!(
            "missing operator in \"{input}\"; valid operators: {}",
            FilterOp::valid_symbols()
        ))),
    }
}

const OPERATOR_CHARS: [char; 4] = ['=', '!', '<', '>'];

/// Splits the operator off the front of `rest`. Longer symbols are tried
/// first; word operators need whitespace (or nothing) after them.
fn split_operator(rest: &str) -> Option<(FilterOp, &str)> {
    const SYMBOLS: [(&str, FilterOp); 7] = [
        ("==", FilterOp::Eq),
        ("!=", FilterOp::Ne),
        ("<=", FilterOp::Le),
        (">=", FilterOp::Ge),
        ("<", FilterOp::Lt),
        (">", FilterOp::Gt),
        ("=", FilterOp::Eq),
    ];
    if let Some((op, value)) = SYMBOLS
        .iter()
        .find_map(|(symbol, op)| rest.strip_prefix(*symbol).map(|value| (*op, value)))
    {
        return Some((op, value));
    }

    [("array-contains", FilterOp::ArrayContains), ("in", FilterOp::In)]
        .into_iter()
        .find_map(|(word, op)| {
            rest.strip_prefix(word)
                .filter(|value| value.is_empty() || value.starts_with(char::is_whitespace))
                .map(|value| (op, value))
        })
}

fn build_filter(input: &str, field: &str, op: FilterOp, value: &str) -> Result<QueryConstraint> {
    let field = field.trim();
    let value = value.trim();
    if field.is_empty() {
        return Err(Error::InvalidQuery(format!("missing field name in \"{input}\"")));
    }
    if value.is_empty() {
        return Err(Error::InvalidQuery(format!("missing value in \"{input}\"")));
    }
    Ok(QueryConstraint::filter(field, op, parse_value(value)))
}

/// Parse an order-by expression: `field`, `field:asc` or `field:desc`.
pub fn parse_order(input: &str) -> Result<QueryConstraint> {
    let (field, direction) = match input.trim().rsplit_once(':') {
        Some((field, "asc")) => (field, Direction::Asc),
        Some((field, "desc")) => (field, Direction::Desc),
        Some((_, other)) => {
            return Err(Error::InvalidQuery(format!(
                "unknown sort direction '{other}'; use 'asc' or 'desc'"
            )));
        }
        None => (input.trim(), Direction::Asc),
    };
    if field.trim().is_empty() {
        return Err(Error::InvalidQuery("order by has an empty field name".to_string()));
    }
    Ok(QueryConstraint::order_by(field.trim(), direction))
}

/// Reads a command-line value as JSON, falling back to a plain string.
pub fn parse_value(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

/// Looks up a possibly dotted field path; `id` addresses the record id.
fn field_value<'a>(record: &'a Record, path: &str) -> Option<Cow<'a, Value>> {
    if path == "id" {
        return Some(Cow::Owned(Value::String(record.id.clone())));
    }
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.fields.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(Cow::Borrowed(current))
}

fn compare(actual: &Value, op: FilterOp, expected: &Value) -> bool {
    match op {
        FilterOp::Eq => values_equal(actual, expected),
        FilterOp::Ne => !actual.is_null() && !values_equal(actual, expected),
        FilterOp::Lt => partial_cmp(actual, expected) == Some(Ordering::Less),
        FilterOp::Le => matches!(partial_cmp(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Gt => partial_cmp(actual, expected) == Some(Ordering::Greater),
        FilterOp::Ge => {
            matches!(partial_cmp(actual, expected), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOp::In => expected.as_array().is_some_and(|candidates| {
            candidates.iter().any(|candidate| values_equal(actual, candidate))
        }),
        FilterOp::ArrayContains => {
            actual.as_array().is_some_and(|items| items.iter().any(|item| values_equal(item, expected)))
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Compares values of the same kind; values of different kinds are unordered.
fn partial_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Orders any two values: null < bool < number < string < array < object.
fn total_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                let ordering = total_cmp(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => partial_cmp(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b))),
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
