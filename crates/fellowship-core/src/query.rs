//! Query descriptions.
//!
//! A [`QuerySpec`] only describes a query; the remote store evaluates it.
//! [`QuerySpec::apply`] gives stores without a query engine of their own
//! (the filesystem store) the same semantics: filters match only values of
//! the same type, documents missing the order field are excluded, and ties
//! are broken by document id.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{RemoteDocument, Timestamp};
use crate::error::{Error, InvalidInputError};

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    ArrayContains,
    In,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::ArrayContains => "array-contains",
            Operator::In => "in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "array-contains" => Operator::ArrayContains,
            "in" => Operator::In,
            other => {
                return Err(InvalidInputError::Query {
                    reason: format!("unknown operator '{}'", other),
                }
                .into());
            }
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Asc),
            "desc" | "descending" => Ok(Direction::Desc),
            other => Err(InvalidInputError::Query {
                reason: format!("unknown sort direction '{}'", other),
            }
            .into()),
        }
    }
}

/// A single `(field, operator, value)` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Filter {
    /// Returns true if the document satisfies this filter.
    pub fn matches(&self, doc: &RemoteDocument) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };

        match self.op {
            Operator::Eq => values_equal(actual, &self.value),
            Operator::Ne => !actual.is_null() && !values_equal(actual, &self.value),
            Operator::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            Operator::Le => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|item| values_equal(item, &self.value))),
            Operator::In => self
                .value
                .as_array()
                .is_some_and(|options| options.iter().any(|option| values_equal(actual, option))),
        }
    }
}

/// Sort key and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filters, ordering, and a result limit for one collection read.
///
/// # Example
///
/// ```
/// use fellowship_core::{Direction, Operator, QuerySpec};
/// use serde_json::json;
///
/// let upcoming = QuerySpec::new()
///     .filter("published", Operator::Eq, json!(true))
///     .order_by("date", Direction::Asc)
///     .limit(20);
///
/// assert_eq!(upcoming.limit_value(), Some(20));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    filters: Vec<Filter>,
    #[serde(default)]
    order_by: Option<OrderBy>,
    #[serde(default)]
    limit: Option<u32>,
}

impl QuerySpec {
    /// A query matching every document in the collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: Operator, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    pub fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    /// Reject queries no store can answer.
    pub fn validate(&self) -> Result<(), Error> {
        for filter in &self.filters {
            if filter.field.is_empty() || filter.field.split('.').any(str::is_empty) {
                return Err(InvalidInputError::Query {
                    reason: format!("invalid field path '{}'", filter.field),
                }
                .into());
            }
            if filter.op == Operator::In && !filter.value.is_array() {
                return Err(InvalidInputError::Query {
                    reason: format!("'in' filter on '{}' needs an array value", filter.field),
                }
                .into());
            }
        }
        if let Some(order) = &self.order_by
            && order.field.is_empty()
        {
            return Err(InvalidInputError::Query {
                reason: "order field cannot be empty".to_string(),
            }
            .into());
        }
        if self.limit == Some(0) {
            return Err(InvalidInputError::Query {
                reason: "limit must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Canonical string for this query, stable across equal specs.
    ///
    /// Used to key cached snapshots; filters keep their declared order.
    /// Field paths are JSON-quoted so separators inside a name cannot
    /// collide with another spec.
    pub fn cache_key(&self) -> String {
        let mut parts = Vec::new();
        for f in &self.filters {
            parts.push(format!("where:{}{}{}", quoted(&f.field), f.op, f.value));
        }
        if let Some(order) = &self.order_by {
            let dir = match order.direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            parts.push(format!("order:{}:{}", quoted(&order.field), dir));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit:{}", limit));
        }
        if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join(";")
        }
    }

    /// Returns true if the document passes every filter.
    pub fn matches(&self, doc: &RemoteDocument) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Evaluate this query over an in-memory set of documents.
    pub fn apply(&self, docs: impl IntoIterator<Item = RemoteDocument>) -> Vec<RemoteDocument> {
        let mut matched: Vec<RemoteDocument> = docs.into_iter().filter(|d| self.matches(d)).collect();

        match &self.order_by {
            Some(order) => {
                matched.retain(|d| d.get(&order.field).is_some());
                matched.sort_by(|a, b| {
                    let ord = match (a.get(&order.field), b.get(&order.field)) {
                        (Some(x), Some(y)) => order_values(x, y),
                        _ => Ordering::Equal,
                    }
                    .then_with(|| a.id.cmp(&b.id));
                    match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                });
            }
            None => matched.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit as usize);
        }
        matched
    }
}

/// Compare two values of the same type. Returns `None` across types.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (Timestamp::from_value(a), Timestamp::from_value(b)) {
        return Some(x.cmp(&y));
    }
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}

/// Rank of a value's type in the store's cross-type ordering.
fn type_rank(value: &Value) -> u8 {
    if Timestamp::from_value(value).is_some() {
        return 3;
    }
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over field values: by type first, then by value.
pub fn order_values(a: &Value, b: &Value) -> Ordering {
    type_rank(a)
        .cmp(&type_rank(b))
        .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal))
}

fn quoted(field: &str) -> String {
    Value::String(field.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fields;
    use crate::types::DocumentId;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> RemoteDocument {
        RemoteDocument::new(DocumentId::new(id).unwrap(), Fields::new(fields).unwrap())
    }

    fn ts(seconds: i64) -> Value {
        json!({ "seconds": seconds, "nanoseconds": 0 })
    }

    #[test]
    fn orders_by_date_and_limits() {
        let docs: Vec<_> = (0..25)
            .map(|i| doc(&format!("e{:02}", i), json!({ "date": ts(1_000 - i * 10) })))
            .collect();

        let query = QuerySpec::new().order_by("date", Direction::Asc).limit(20);
        let result = query.apply(docs);

        assert_eq!(result.len(), 20);
        for pair in result.windows(2) {
            let a = Timestamp::from_value(pair[0].get("date").unwrap()).unwrap();
            let b = Timestamp::from_value(pair[1].get("date").unwrap()).unwrap();
            assert!(a <= b);
        }
    }

    #[test]
    fn range_filters_ignore_other_types() {
        let docs = vec![
            doc("a", json!({ "date": ts(100) })),
            doc("b", json!({ "date": "2024-01-01" })),
            doc("c", json!({ "date": ts(300) })),
        ];
        let query = QuerySpec::new().filter("date", Operator::Ge, ts(100));
        let ids: Vec<_> = query.apply(docs).into_iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn order_by_excludes_missing_fields() {
        let docs = vec![doc("a", json!({ "n": 2 })), doc("b", json!({})), doc("c", json!({ "n": 1 }))];
        let query = QuerySpec::new().order_by("n", Direction::Desc);
        let ids: Vec<_> = query.apply(docs).into_iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn membership_operators() {
        let docs = vec![
            doc("a", json!({ "tags": ["youth", "music"], "day": "sun" })),
            doc("b", json!({ "tags": ["seniors"], "day": "wed" })),
        ];

        let contains = QuerySpec::new().filter("tags", Operator::ArrayContains, json!("music"));
        assert_eq!(contains.apply(docs.clone()).len(), 1);

        let within = QuerySpec::new().filter("day", Operator::In, json!(["sun", "wed"]));
        assert_eq!(within.apply(docs.clone()).len(), 2);

        let not_sunday = QuerySpec::new().filter("day", Operator::Ne, json!("sun"));
        assert_eq!(not_sunday.apply(docs)[0].id.as_str(), "b");
    }

    #[test]
    fn integer_and_float_compare() {
        assert_eq!(compare_values(&json!(1), &json!(1.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(2), &json!(2.0)), Some(Ordering::Equal));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }

    #[test]
    fn cache_key_is_stable_and_distinct() {
        let a = QuerySpec::new().order_by("date", Direction::Asc).limit(20);
        let b = QuerySpec::new().order_by("date", Direction::Asc).limit(20);
        let c = QuerySpec::new().order_by("date", Direction::Desc).limit(20);

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(QuerySpec::new().cache_key(), "all");
    }

    #[test]
    fn cache_key_separates_odd_field_names() {
        let single = QuerySpec::new().filter("a==1;where:b", Operator::Eq, json!(2));
        let pair = QuerySpec::new()
            .filter("a", Operator::Eq, json!(1))
            .filter("b", Operator::Eq, json!(2));
        assert_ne!(single.cache_key(), pair.cache_key());

        let ordered = QuerySpec::new().order_by("date:asc", Direction::Desc);
        let plain = QuerySpec::new().order_by("date", Direction::Asc);
        assert_ne!(ordered.cache_key(), plain.cache_key());
        assert_eq!(plain.cache_key(), r#"order:"date":asc"#);
    }

    #[test]
    fn validation_rejects_bad_queries() {
        assert!(QuerySpec::new().limit(0).validate().is_err());
        assert!(QuerySpec::new().filter("", Operator::Eq, json!(1)).validate().is_err());
        assert!(QuerySpec::new().filter("day", Operator::In, json!("sun")).validate().is_err());
        assert!(QuerySpec::new().filter("a.b", Operator::Eq, json!(1)).validate().is_ok());
    }

    #[test]
    fn parses_operators_and_directions() {
        assert_eq!("<=".parse::<Operator>().unwrap(), Operator::Le);
        assert!("~".parse::<Operator>().is_err());
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
    }
}
