//! Ordered range queries over the children of a path
//!
//! A query orders children by exactly one field (the child key or a
//! top-level field of the child document). Ties are broken by child key,
//! and bounds may name a key so callers can resume at an exact child.
//! Results are always returned in ascending order.

use crate::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;

/// Scalar value a child is ordered by.
///
/// Type order: null < bool < number < text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OrderValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl OrderValue {
    fn rank(&self) -> u8 {
        match self {
            OrderValue::Null => 0,
            OrderValue::Bool(_) => 1,
            OrderValue::Number(_) => 2,
            OrderValue::Text(_) => 3,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => OrderValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(OrderValue::Number).unwrap_or(OrderValue::Null),
            Value::String(s) => OrderValue::Text(s.clone()),
            _ => OrderValue::Null,
        }
    }
}

impl Ord for OrderValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (OrderValue::Bool(a), OrderValue::Bool(b)) => a.cmp(b),
            (OrderValue::Number(a), OrderValue::Number(b)) => a.total_cmp(b),
            (OrderValue::Text(a), OrderValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for OrderValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderValue {}

impl From<f64> for OrderValue {
    fn from(value: f64) -> Self {
        OrderValue::Number(value)
    }
}

impl From<&str> for OrderValue {
    fn from(value: &str) -> Self {
        OrderValue::Text(value.to_string())
    }
}

impl From<String> for OrderValue {
    fn from(value: String) -> Self {
        OrderValue::Text(value)
    }
}

impl From<bool> for OrderValue {
    fn from(value: bool) -> Self {
        OrderValue::Bool(value)
    }
}

/// The single field a query orders by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    Key,
    Child(String),
}

/// Inclusive range bound; `key` resolves ties on the ordered value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub value: OrderValue,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    First(usize),
    Last(usize),
}

/// One child of a queried path
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub key: String,
    pub value: Value,
}

impl Snapshot {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Decode the child document
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.value.clone()).map_err(|e| StoreError::Decode {
            path: self.key.clone(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    order_by: OrderBy,
    start: Option<Bound>,
    end: Option<Bound>,
    limit: Option<Limit>,
}

impl Default for Query {
    fn default() -> Self {
        Self::ordered_by_key()
    }
}

impl Query {
    pub fn ordered_by_key() -> Self {
        Self {
            order_by: OrderBy::Key,
            start: None,
            end: None,
            limit: None,
        }
    }

    pub fn ordered_by_child(field: impl Into<String>) -> Self {
        Self {
            order_by: OrderBy::Child(field.into()),
            start: None,
            end: None,
            limit: None,
        }
    }

    pub fn start_at(mut self, value: impl Into<OrderValue>, key: Option<String>) -> Self {
        self.start = Some(Bound {
            value: value.into(),
            key,
        });
        self
    }

    pub fn end_at(mut self, value: impl Into<OrderValue>, key: Option<String>) -> Self {
        self.end = Some(Bound {
            value: value.into(),
            key,
        });
        self
    }

    pub fn equal_to(self, value: impl Into<OrderValue>) -> Self {
        let value = value.into();
        self.start_at(value.clone(), None).end_at(value, None)
    }

    pub fn limit_to_first(mut self, n: usize) -> Self {
        self.limit = Some(Limit::First(n));
        self
    }

    pub fn limit_to_last(mut self, n: usize) -> Self {
        self.limit = Some(Limit::Last(n));
        self
    }

    pub fn order_by(&self) -> &OrderBy {
        &self.order_by
    }

    pub fn limit(&self) -> Option<Limit> {
        self.limit
    }

    /// Value this query orders the given child by
    pub fn order_value(&self, snapshot: &Snapshot) -> OrderValue {
        match &self.order_by {
            OrderBy::Key => OrderValue::Text(snapshot.key.clone()),
            OrderBy::Child(field) => snapshot
                .value
                .get(field)
                .map(OrderValue::from_json)
                .unwrap_or(OrderValue::Null),
        }
    }

    fn compare(&self, a: &Snapshot, b: &Snapshot) -> Ordering {
        self.order_value(a)
            .cmp(&self.order_value(b))
            .then_with(|| a.key.cmp(&b.key))
    }

    fn compare_to_bound(&self, snapshot: &Snapshot, bound: &Bound) -> Ordering {
        let by_value = self.order_value(snapshot).cmp(&bound.value);
        match (&bound.key, by_value) {
            (Some(key), Ordering::Equal) => snapshot.key.as_str().cmp(key.as_str()),
            (_, ordering) => ordering,
        }
    }

    /// Whether a child falls inside the start/end bounds (limits ignored)
    pub fn within_bounds(&self, snapshot: &Snapshot) -> bool {
        let after_start = self
            .start
            .as_ref()
            .map(|b| self.compare_to_bound(snapshot, b) != Ordering::Less)
            .unwrap_or(true);
        let before_end = self
            .end
            .as_ref()
            .map(|b| self.compare_to_bound(snapshot, b) != Ordering::Greater)
            .unwrap_or(true);
        after_start && before_end
    }

    /// Sort, filter and limit a set of children
    pub fn apply(&self, children: Vec<Snapshot>) -> Vec<Snapshot> {
        let mut matched: Vec<Snapshot> = children
            .into_iter()
            .filter(|s| self.within_bounds(s))
            .collect();
        matched.sort_by(|a, b| self.compare(a, b));

        match self.limit {
            Some(Limit::First(n)) => {
                matched.truncate(n);
                matched
            }
            Some(Limit::Last(n)) => {
                let skip = matched.len().saturating_sub(n);
                matched.split_off(skip)
            }
            None => matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, ts: f64) -> Snapshot {
        Snapshot::new(key, json!({ "timestamp": ts }))
    }

    fn keys(snapshots: &[Snapshot]) -> Vec<&str> {
        snapshots.iter().map(|s| s.key.as_str()).collect()
    }

    #[test]
    fn test_order_value_type_ranking() {
        assert!(OrderValue::Null < OrderValue::Bool(false));
        assert!(OrderValue::Bool(true) < OrderValue::Number(-1.0));
        assert!(OrderValue::Number(1e9) < OrderValue::Text(String::new()));
        assert_eq!(OrderValue::Number(2.0), OrderValue::from(2.0));
    }

    #[test]
    fn test_child_ordering_breaks_ties_by_key() {
        let query = Query::ordered_by_child("timestamp");
        let result = query.apply(vec![entry("c", 9.0), entry("a", 10.0), entry("b", 9.0)]);
        assert_eq!(keys(&result), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_limit_to_last_keeps_tail() {
        let query = Query::ordered_by_child("timestamp").limit_to_last(2);
        let result = query.apply(vec![entry("a", 1.0), entry("b", 2.0), entry("c", 3.0)]);
        assert_eq!(keys(&result), vec!["b", "c"]);
    }

    #[test]
    fn test_end_at_with_key_is_inclusive_composite() {
        let children = vec![entry("a", 8.0), entry("b", 9.0), entry("c", 9.0), entry("d", 10.0)];

        let value_only = Query::ordered_by_child("timestamp").end_at(9.0, None);
        assert_eq!(keys(&value_only.apply(children.clone())), vec!["a", "b", "c"]);

        let with_key = Query::ordered_by_child("timestamp").end_at(9.0, Some("b".into()));
        assert_eq!(keys(&with_key.apply(children)), vec!["a", "b"]);
    }

    #[test]
    fn test_equal_to_on_text_field() {
        let children = vec![
            Snapshot::new("u1", json!({ "username_key": "alice" })),
            Snapshot::new("u2", json!({ "username_key": "bob" })),
        ];
        let query = Query::ordered_by_child("username_key").equal_to("bob");
        assert_eq!(keys(&query.apply(children)), vec!["u2"]);
    }

    #[test]
    fn test_key_ordering_with_start_at() {
        let children = vec![
            Snapshot::new("b", json!(1)),
            Snapshot::new("a", json!(1)),
            Snapshot::new("c", json!(1)),
        ];
        let query = Query::ordered_by_key().start_at("b", None).limit_to_first(5);
        assert_eq!(keys(&query.apply(children)), vec!["b", "c"]);
    }

    #[test]
    fn test_snapshot_decode_error_names_key() {
        let snapshot = Snapshot::new("p1", json!("not an object"));
        let err = snapshot.decode::<std::collections::HashMap<String, f64>>().unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref path, .. } if path == "p1"));
    }
}
