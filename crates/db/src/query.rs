use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

use crate::document::{lookup, Document};

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A single field predicate. Values of different JSON types never match.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = lookup(&doc.data, &self.field) else {
            return false;
        };

        let ordering = compare_values(actual, &self.value);
        match self.op {
            FilterOp::Eq => ordering == Some(Ordering::Equal) || actual == &self.value,
            FilterOp::Lt => ordering == Some(Ordering::Less),
            FilterOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Gt => ordering == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Collection query: conjunction of filters, optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Add an equality filter only when a value is present.
    pub fn eq_opt<V: Into<Value>>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(doc))
    }

    /// Filter, sort and truncate a candidate set.
    ///
    /// Documents missing the order-by field sort last; ties break on id.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut selected: Vec<Document> = docs.into_iter().filter(|doc| self.matches(doc)).collect();

        if let Some(order) = &self.order_by {
            selected.sort_by(|a, b| {
                let ordering = match (a.field(&order.field), b.field(&order.field)) {
                    (Some(x), Some(y)) => {
                        let ordering = compare_values(x, y).unwrap_or(Ordering::Equal);
                        match order.direction {
                            Direction::Ascending => ordering,
                            Direction::Descending => ordering.reverse(),
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });
        } else {
            selected.sort_by(|a, b| a.id.cmp(&b.id));
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Order two JSON scalars of the same type.
///
/// Strings that both parse as RFC 3339 timestamps compare chronologically so
/// range filters on dates are not thrown off by varying sub-second precision.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        let now = Utc::now();
        Document {
            collection: "books".into(),
            id: id.into(),
            version: 1,
            data,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> Vec<Document> {
        vec![
            doc("a", json!({"genre": "novela", "price_cents": 1500, "published": "2021-03-01T00:00:00Z"})),
            doc("b", json!({"genre": "poesia", "price_cents": 900, "published": "2019-06-15T12:00:00.250Z"})),
            doc("c", json!({"genre": "novela", "price_cents": 2200})),
            doc("d", json!({"genre": "novela", "price_cents": "cheap"})),
        ]
    }

    #[test]
    fn test_equality_and_range_filters() {
        let query = Query::new()
            .eq("genre", "novela")
            .filter("price_cents", FilterOp::Gte, 1500);
        let ids: Vec<_> = query.apply(catalog()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_mismatched_types_never_match() {
        let query = Query::new().filter("price_cents", FilterOp::Lt, 100_000);
        let ids: Vec<_> = query.apply(catalog()).into_iter().map(|d| d.id).collect();
        assert!(!ids.contains(&"d".to_string()));
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        let query = Query::new().filter("published", FilterOp::Lt, "2019-06-15T12:00:01Z");
        let ids: Vec<_> = query.apply(catalog()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_order_by_descending_with_limit() {
        let query = Query::new()
            .order_by("price_cents", Direction::Descending)
            .limit(2);
        let ids: Vec<_> = query.apply(catalog()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_missing_order_field_sorts_last() {
        let query = Query::new().order_by("published", Direction::Ascending);
        let ids: Vec<_> = query.apply(catalog()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_eq_opt_skips_none() {
        let query = Query::new().eq_opt::<&str>("genre", None);
        assert!(query.filters.is_empty());
    }
}
