//! # Table Queries
//!
//! Structured filters over entity properties. A filter renders to the
//! service's OData filter syntax with [`Filter::to_odata`] for transports
//! that send it over the wire, and evaluates in-process with
//! [`Filter::matches`] for the in-memory client.

use super::entity::EntityKey;
use crate::constants::properties::{PARTITION_KEY, ROW_KEY};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    pub fn as_odata(self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "ge",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "le",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::GreaterThanOrEqual => ordering != Ordering::Less,
            Self::LessThan => ordering == Ordering::Less,
            Self::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

/// Boolean filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Condition {
        property: String,
        comparison: Comparison,
        value: Value,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn condition(
        property: impl Into<String>,
        comparison: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        Self::Condition {
            property: property.into(),
            comparison,
            value: value.into(),
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(property, Comparison::Equal, value)
    }

    pub fn partition_key_eq(partition_key: &str) -> Self {
        Self::eq(PARTITION_KEY, partition_key)
    }

    pub fn and(self, other: Filter) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Render to the service's filter string
    pub fn to_odata(&self) -> String {
        match self {
            Self::Condition {
                property,
                comparison,
                value,
            } => format!("{property} {} {}", comparison.as_odata(), odata_literal(value)),
            Self::And(l, r) => format!("({}) and ({})", l.to_odata(), r.to_odata()),
            Self::Or(l, r) => format!("({}) or ({})", l.to_odata(), r.to_odata()),
            Self::Not(inner) => format!("not ({})", inner.to_odata()),
        }
    }

    /// Evaluate against an entity's keys and serialized properties.
    ///
    /// A condition on a missing property is false.
    pub fn matches(&self, key: &EntityKey, properties: &Value) -> bool {
        match self {
            Self::Condition {
                property,
                comparison,
                value,
            } => {
                let actual = match property.as_str() {
                    PARTITION_KEY => Some(Value::String(key.partition_key.clone())),
                    ROW_KEY => Some(Value::String(key.row_key.clone())),
                    name => properties.get(name).cloned(),
                };
                actual
                    .as_ref()
                    .and_then(|actual| compare_values(actual, value))
                    .is_some_and(|ordering| comparison.accepts(ordering))
            }
            Self::And(l, r) => l.matches(key, properties) && r.matches(key, properties),
            Self::Or(l, r) => l.matches(key, properties) || r.matches(key, properties),
            Self::Not(inner) => !inner.matches(key, properties),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_odata())
    }
}

fn odata_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn compare_values(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Filter plus an optional result limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub filter: Option<Filter>,
    pub take: Option<usize>,
}

impl TableQuery {
    /// Query returning every entity in the table
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            take: None,
        }
    }

    pub fn partition(partition_key: &str) -> Self {
        Self::filtered(Filter::partition_key_eq(partition_key))
    }

    pub fn take(mut self, count: usize) -> Self {
        self.take = Some(count);
        self
    }

    pub fn matches(&self, key: &EntityKey, properties: &Value) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.matches(key, properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partition_filter_renders_like_the_service() {
        assert_eq!(
            Filter::partition_key_eq("P1").to_odata(),
            "PartitionKey eq 'P1'"
        );
        assert_eq!(
            Filter::partition_key_eq("O'Brien").to_odata(),
            "PartitionKey eq 'O''Brien'"
        );
    }

    #[test]
    fn test_compound_filter_rendering() {
        let filter = Filter::partition_key_eq("P1")
            .and(Filter::condition("Age", Comparison::GreaterThanOrEqual, 21))
            .or(Filter::eq("Active", true).not());
        assert_eq!(
            filter.to_string(),
            "((PartitionKey eq 'P1') and (Age ge 21)) or (not (Active eq true))"
        );
    }

    #[test]
    fn test_filter_evaluation() {
        let key = EntityKey::new("P1", "R5");
        let props = json!({"Age": 30, "Name": "ada"});

        assert!(Filter::partition_key_eq("P1").matches(&key, &props));
        assert!(!Filter::partition_key_eq("P2").matches(&key, &props));
        assert!(Filter::condition(ROW_KEY, Comparison::GreaterThan, "R10").matches(&key, &props));
        assert!(Filter::condition("Age", Comparison::LessThan, 31).matches(&key, &props));
        assert!(!Filter::eq("Missing", 1).matches(&key, &props));
        assert!(Filter::eq("Missing", 1).not().matches(&key, &props));
        assert!(!Filter::eq("Age", "30").matches(&key, &props));
    }

    #[test]
    fn test_unfiltered_query_matches_everything() {
        let query = TableQuery::all().take(5);
        assert!(query.matches(&EntityKey::new("a", "b"), &json!({})));
        assert_eq!(query.take, Some(5));
    }
}
