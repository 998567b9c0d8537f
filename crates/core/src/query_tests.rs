// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::document::to_document;
use serde_json::json;
use yare::parameterized;

fn rec(id: &str, fields: Value) -> Record {
    Record::new(id, to_document(fields).unwrap())
}

fn fleet() -> Vec<Record> {
    vec![
        rec("v1", json!({"plate": "AB-1", "status": "active", "capacity": 12, "tags": ["reefer"], "depot": {"city": "Lyon"}})),
        rec("v2", json!({"plate": "AB-2", "status": "idle", "capacity": 8, "tags": []})),
        rec("v3", json!({"plate": "AB-3", "status": "active", "capacity": 20.0, "depot": {"city": "Nice"}})),
        rec("v4", json!({"plate": "AB-4", "status": "retired"})),
    ]
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

// Validation

#[test]
fn empty_query_is_valid() {
    assert!(Query::new(vec![]).is_ok());
    assert!(Query::all().is_unconstrained());
}

#[parameterized(
    empty_field = { vec![QueryConstraint::filter("", FilterOp::Eq, 1)] },
    zero_limit = { vec![QueryConstraint::limit(0)] },
    two_limits = { vec![QueryConstraint::limit(1), QueryConstraint::limit(2)] },
    in_not_array = { vec![QueryConstraint::filter("status", FilterOp::In, "active")] },
    in_empty = { vec![QueryConstraint::filter("status", FilterOp::In, json!([]))] },
    in_too_many = { vec![QueryConstraint::filter("n", FilterOp::In, Value::Array((0..31).map(Value::from).collect()))] },
    two_range_fields = { vec![
        QueryConstraint::filter("capacity", FilterOp::Gt, 1),
        QueryConstraint::filter("km", FilterOp::Lt, 5),
    ] },
    empty_order_field = { vec![QueryConstraint::order_by(" ", Direction::Asc)] },
    duplicate_order = { vec![
        QueryConstraint::order_by("plate", Direction::Asc),
        QueryConstraint::order_by("plate", Direction::Desc),
    ] },
)]
fn invalid_queries_are_rejected(constraints: Vec<QueryConstraint>) {
    assert!(matches!(Query::new(constraints), Err(Error::InvalidQuery(_))));
}

#[test]
fn range_filters_on_one_field_are_allowed() {
    let query = Query::new(vec![
        QueryConstraint::filter("capacity", FilterOp::Ge, 10),
        QueryConstraint::filter("capacity", FilterOp::Lt, 20),
    ]);
    assert!(query.is_ok());
}

#[test]
fn deserialized_query_can_be_revalidated() {
    let query: Query = serde_json::from_value(json!([{"kind": "limit", "n": 0}])).unwrap();
    assert!(query.validate().is_err());
}

#[test]
fn constraints_serialize_tagged() {
    let query = Query::new(vec![
        QueryConstraint::filter("status", FilterOp::Eq, "active"),
        QueryConstraint::order_by("plate", Direction::Desc),
        QueryConstraint::limit(5),
    ])
    .unwrap();
    assert_eq!(
        serde_json::to_value(&query).unwrap(),
        json!([
            {"kind": "filter", "field": "status", "op": "==", "value": "active"},
            {"kind": "order_by", "field": "plate", "direction": "desc"},
            {"kind": "limit", "n": 5},
        ])
    );
}

// Evaluation

#[parameterized(
    eq_string = { QueryConstraint::filter("status", FilterOp::Eq, "active"), vec!["v1", "v3"] },
    eq_int_matches_float = { QueryConstraint::filter("capacity", FilterOp::Eq, 20), vec!["v3"] },
    ne_excludes_missing = { QueryConstraint::filter("capacity", FilterOp::Ne, 8), vec!["v1", "v3"] },
    lt = { QueryConstraint::filter("capacity", FilterOp::Lt, 12), vec!["v2"] },
    le = { QueryConstraint::filter("capacity", FilterOp::Le, 12), vec!["v1", "v2"] },
    gt = { QueryConstraint::filter("capacity", FilterOp::Gt, 12), vec!["v3"] },
    ge = { QueryConstraint::filter("capacity", FilterOp::Ge, 12), vec!["v1", "v3"] },
    range_across_types_is_false = { QueryConstraint::filter("plate", FilterOp::Gt, 1), vec![] },
    in_list = { QueryConstraint::filter("status", FilterOp::In, json!(["idle", "retired"])), vec!["v2", "v4"] },
    array_contains = { QueryConstraint::filter("tags", FilterOp::ArrayContains, "reefer"), vec!["v1"] },
    dotted_path = { QueryConstraint::filter("depot.city", FilterOp::Eq, "Nice"), vec!["v3"] },
    by_id = { QueryConstraint::filter("id", FilterOp::Eq, "v2"), vec!["v2"] },
)]
fn filters_select_expected_records(constraint: QueryConstraint, expected: Vec<&str>) {
    let query = Query::new(vec![constraint]).unwrap();
    assert_eq!(ids(&query.apply(fleet())), expected);
}

#[test]
fn unconstrained_query_sorts_by_id() {
    let mut records = fleet();
    records.reverse();
    assert_eq!(ids(&Query::all().apply(records)), vec!["v1", "v2", "v3", "v4"]);
}

#[test]
fn order_by_excludes_records_missing_the_field() {
    let query = Query::new(vec![QueryConstraint::order_by("capacity", Direction::Desc)]).unwrap();
    assert_eq!(ids(&query.apply(fleet())), vec!["v3", "v1", "v2"]);
}

#[test]
fn order_by_multiple_keys_then_limit() {
    let query = Query::new(vec![
        QueryConstraint::order_by("status", Direction::Asc),
        QueryConstraint::order_by("plate", Direction::Desc),
        QueryConstraint::limit(3),
    ])
    .unwrap();
    assert_eq!(ids(&query.apply(fleet())), vec!["v3", "v1", "v2"]);
}

#[test]
fn limit_truncates_after_filtering() {
    let query = Query::new(vec![
        QueryConstraint::filter("status", FilterOp::Eq, "active"),
        QueryConstraint::limit(1),
    ])
    .unwrap();
    assert_eq!(ids(&query.apply(fleet())), vec!["v1"]);
}

// Parsing

#[parameterized(
    eq_spaced = { "status == active", "status", FilterOp::Eq, json!("active") },
    eq_single = { "status=active", "status", FilterOp::Eq, json!("active") },
    ne = { "status != idle", "status", FilterOp::Ne, json!("idle") },
    ge_number = { "capacity>=10", "capacity", FilterOp::Ge, json!(10) },
    lt_float = { "load < 2.5", "load", FilterOp::Lt, json!(2.5) },
    gt_bool = { "active > false", "active", FilterOp::Gt, json!(false) },
    quoted = { "plate == \"10\"", "plate", FilterOp::Eq, json!("10") },
    in_array = { "status in [\"idle\",\"active\"]", "status", FilterOp::In, json!(["idle", "active"]) },
    array_contains = { "tags array-contains reefer", "tags", FilterOp::ArrayContains, json!("reefer") },
    value_with_in = { r#"city == "Port in Bay""#, "city", FilterOp::Eq, json!("Port in Bay") },
    value_with_array_contains = { "note != a array-contains b", "note", FilterOp::Ne, json!("a array-contains b") },
    value_with_symbols = { "label == a<=b", "label", FilterOp::Eq, json!("a<=b") },
    nested_field = { "location.city in [\"Oslo\"]", "location.city", FilterOp::In, json!(["Oslo"]) },
)]
fn parse_filter_expressions(input: &str, field: &str, op: FilterOp, value: Value) {
    assert_eq!(parse_filter(input).unwrap(), QueryConstraint::filter(field, op, value));
}

#[parameterized(
    empty = { "" },
    no_operator = { "status active" },
    no_field = { "== active" },
    no_value = { "status ==" },
    bang_alone = { "status ! active" },
    word_prefix = { "status inactive" },
    in_without_value = { "status in" },
)]
fn parse_filter_rejects(input: &str) {
    assert!(matches!(parse_filter(input), Err(Error::InvalidQuery(_))));
}

#[parameterized(
    bare = { "plate", Direction::Asc },
    asc = { "plate:asc", Direction::Asc },
    desc = { "plate:desc", Direction::Desc },
)]
fn parse_order_expressions(input: &str, direction: Direction) {
    assert_eq!(parse_order(input).unwrap(), QueryConstraint::order_by("plate", direction));
}

#[test]
fn parse_order_rejects_unknown_direction() {
    assert!(parse_order("plate:sideways").is_err());
    assert!(parse_order(":desc").is_err());
}

#[test]
fn display_round_trips_to_readable_text() {
    let query = Query::new(vec![
        QueryConstraint::filter("status", FilterOp::Eq, "active"),
        QueryConstraint::order_by("plate", Direction::Desc),
        QueryConstraint::limit(2),
    ])
    .unwrap();
    assert_eq!(query.to_string(), "status == \"active\", order by plate desc, limit 2");
    assert_eq!(Query::all().to_string(), "all");
}
