//! Filter, sort and page primitives evaluated against JSON documents
//!
//! The store is schema-less: documents are JSON objects and queries address
//! top-level fields by name. Comparison follows a fixed type rank
//! (null < bool < number < string < array < object) so mixed-type fields
//! still sort deterministically, and strings that parse as RFC 3339
//! timestamps are compared as instants rather than lexically.

use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;

/// One filter condition. Conditions on a [`Filter`] are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value
    Eq(String, Value),
    /// Field is absent or differs from the value
    Ne(String, Value),
    /// Field (scalar or array) intersects the given values
    AnyOf(String, Vec<Value>),
    /// Any of the fields contains the needle, case-insensitively
    TextContains(Vec<String>, String),
}

impl Condition {
    fn matches(&self, doc: &Value) -> bool {
        match self {
            Condition::Eq(field, expected) => doc.get(field) == Some(expected),
            Condition::Ne(field, expected) => doc.get(field) != Some(expected),
            Condition::AnyOf(field, values) => match doc.get(field) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                Some(scalar) => values.contains(scalar),
                None => false,
            },
            Condition::TextContains(fields, needle) => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    doc.get(field)
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            }
        }
    }
}

/// Conjunction of [`Condition`]s.
///
/// # Examples
///
/// ```
/// use org_store::{Filter};
/// use serde_json::json;
///
/// let filter = Filter::new()
///     .eq("status", "active")
///     .text(&["name", "display_name"], "acme");
///
/// assert!(filter.matches(&json!({"status": "active", "name": "acme-corp"})));
/// assert!(!filter.matches(&json!({"status": "inactive", "name": "acme-corp"})));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Empty filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require equality on a field.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    /// Require a field to be absent or different from a value.
    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Ne(field.into(), value.into()));
        self
    }

    /// Require a field to intersect the given values.
    pub fn any_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::AnyOf(field.into(), values));
        self
    }

    /// Require a case-insensitive substring match on any of the fields.
    pub fn text(mut self, fields: &[&str], needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::TextContains(
            fields.iter().map(|f| f.to_string()).collect(),
            needle.into(),
        ));
        self
    }

    /// Whether the document satisfies every condition.
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Multi-key sort specification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, Direction)>,
}

impl Sort {
    /// Sort by one field.
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            keys: vec![(field.into(), direction)],
        }
    }

    /// Add a lower-priority sort key.
    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Whether no keys were specified.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compare two documents under this specification.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (field, direction) in &self.keys {
            let ordering = value_cmp(a.get(field), b.get(field));
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// A filtered, sorted, paged read.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Which documents to include
    pub filter: Filter,
    /// Result ordering; an empty sort falls back to ascending `org_id`
    pub sort: Sort,
    /// Documents to skip before the first returned item
    pub offset: usize,
    /// Maximum documents to return (`None` = unbounded)
    pub limit: Option<usize>,
}

impl Query {
    /// Query returning every document in a deterministic order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query over a filter with default ordering.
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Set the sort specification.
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Set the page window.
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional JSON values.
///
/// Missing and `null` are the smallest and equal to each other; otherwise
/// values order by type rank, then within the type.
pub fn value_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(v)) => {
            if v.is_null() {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        (Some(v), None) => {
            if v.is_null() {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (Some(a), Some(b)) => {
            let (rank_a, rank_b) = (type_rank(a), type_rank(b));
            if rank_a != rank_b {
                return rank_a.cmp(&rank_b);
            }
            match (a, b) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
                (Value::String(x), Value::String(y)) => compare_strings(x, y),
                (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()),
                (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
                _ => Ordering::Equal,
            }
        }
    }
}

// Timestamps serialize as RFC 3339 with varying fractional precision, so
// instants must be compared parsed, not lexically.
fn compare_strings(a: &str, b: &str) -> Ordering {
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_eq_and_ne() {
        let doc = json!({"status": "active", "owner_id": "user_1"});

        assert!(Filter::new().eq("status", "active").matches(&doc));
        assert!(!Filter::new().eq("status", "deleted").matches(&doc));
        assert!(Filter::new().ne("status", "deleted").matches(&doc));
        // A missing field is not equal to anything.
        assert!(!Filter::new().eq("parent_org_id", "org_1").matches(&doc));
        assert!(Filter::new().ne("parent_org_id", "org_1").matches(&doc));
    }

    #[test]
    fn test_filter_any_of_over_arrays() {
        let doc = json!({"tags": ["saas", "beta"]});

        let filter = Filter::new().any_of("tags", vec![json!("beta"), json!("gamma")]);
        assert!(filter.matches(&doc));

        let filter = Filter::new().any_of("tags", vec![json!("gamma")]);
        assert!(!filter.matches(&doc));

        assert!(!Filter::new()
            .any_of("missing", vec![json!("x")])
            .matches(&doc));
    }

    #[test]
    fn test_filter_text_is_case_insensitive() {
        let doc = json!({"name": "acme-corp", "display_name": "Acme Corp"});

        assert!(Filter::new().text(&["name"], "ACME").matches(&doc));
        assert!(Filter::new()
            .text(&["description", "display_name"], "corp")
            .matches(&doc));
        assert!(!Filter::new().text(&["name"], "widgets").matches(&doc));
    }

    #[test]
    fn test_value_ordering() {
        assert_eq!(value_cmp(None, Some(&json!(null))), Ordering::Equal);
        assert_eq!(value_cmp(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(
            value_cmp(Some(&json!(false)), Some(&json!(true))),
            Ordering::Less
        );
        assert_eq!(value_cmp(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(
            value_cmp(Some(&json!("abc")), Some(&json!("abd"))),
            Ordering::Less
        );
        // Numbers rank below strings.
        assert_eq!(
            value_cmp(Some(&json!(99)), Some(&json!("1"))),
            Ordering::Less
        );
    }

    #[test]
    fn test_timestamps_compare_as_instants() {
        // Lexically "...56.5Z" would sort before "...56Z"; parsed it must not.
        let earlier = json!("2026-01-01T10:00:56Z");
        let later = json!("2026-01-01T10:00:56.5Z");
        assert_eq!(value_cmp(Some(&earlier), Some(&later)), Ordering::Less);
    }

    #[test]
    fn test_sort_multi_key() {
        let a = json!({"name": "acme", "org_id": "org_2"});
        let b = json!({"name": "acme", "org_id": "org_1"});

        let sort = Sort::by("name", Direction::Asc).then("org_id", Direction::Asc);
        assert_eq!(sort.compare(&a, &b), Ordering::Greater);

        let sort = Sort::by("name", Direction::Desc).then("org_id", Direction::Desc);
        assert_eq!(sort.compare(&a, &b), Ordering::Less);
    }
}
