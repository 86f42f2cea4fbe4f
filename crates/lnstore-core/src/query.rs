//! Range query options and record predicates
//!
//! A [`Query`] bounds a cursor scan by key (prefix and inclusive upper bound)
//! and filters decoded records with per-attribute [`Predicate`]s. All
//! predicates must hold for a record to match.

use crate::value::{Record, Value};

/// Per-attribute filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Attribute equals the value; byte strings compare by content
    Eq(Value),
    /// Attribute is strictly greater than the value (same kind only)
    Gt(Value),
    /// Text attribute starts with the string
    StartsWith(String),
}

impl Predicate {
    /// Whether `value` (the attribute, if defined) satisfies this predicate.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };

        match self {
            Predicate::Eq(expected) => value == expected,
            Predicate::Gt(bound) => match (value, bound) {
                (Value::Int(a), Value::Int(b)) => a > b,
                (Value::Text(a), Value::Text(b)) => a > b,
                (Value::Bytes(a), Value::Bytes(b)) => a > b,
                _ => false,
            },
            Predicate::StartsWith(prefix) => value.as_text().is_some_and(|s| s.starts_with(prefix.as_str())),
        }
    }
}

/// Scan options for [`crate::Store::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Start at the first key >= prefix, stop at the first key without it
    pub key_prefix: Option<Vec<u8>>,
    /// Stop at the first key greater than this
    pub key_upper_bound: Option<Vec<u8>>,
    /// Maximum number of keys read from the range, before `filter` applies
    pub limit: Option<usize>,
    /// Attribute predicates, combined with AND
    pub filter: Vec<(String, Predicate)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn upper_bound(mut self, bound: impl Into<Vec<u8>>) -> Self {
        self.key_upper_bound = Some(bound.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn where_eq(self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(attr, Predicate::Eq(value.into()))
    }

    pub fn where_gt(self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(attr, Predicate::Gt(value.into()))
    }

    pub fn where_starts_with(self, attr: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.filter(attr, Predicate::StartsWith(prefix.into()))
    }

    fn filter(mut self, attr: impl Into<String>, predicate: Predicate) -> Self {
        self.filter.push((attr.into(), predicate));
        self
    }

    /// True once `key` falls past the scan's end.
    pub(crate) fn past_end(&self, key: &[u8]) -> bool {
        if let Some(prefix) = &self.key_prefix {
            if !key.starts_with(prefix) {
                return true;
            }
        }
        match &self.key_upper_bound {
            Some(bound) => key > bound.as_slice(),
            None => false,
        }
    }

    /// Whether a decoded record passes every predicate.
    pub fn matches(&self, record: &Record) -> bool {
        self.filter.iter().all(|(attr, predicate)| predicate.matches(record.get(attr)))
    }
}

/// One query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    pub record: Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new()
            .with("height", 120i64)
            .with("alias", "lightning-node")
            .with("public_key", vec![2u8, 3, 4])
            .with("is_active", true)
    }

    #[test]
    fn test_eq_compares_bytes() {
        let q = Query::new().where_eq("public_key", vec![2u8, 3, 4]);
        assert!(q.matches(&record()));

        let q = Query::new().where_eq("public_key", vec![2u8, 3]);
        assert!(!q.matches(&record()));
    }

    #[test]
    fn test_gt_and_starts_with() {
        assert!(Query::new().where_gt("height", 100i64).matches(&record()));
        assert!(!Query::new().where_gt("height", 120i64).matches(&record()));
        assert!(Query::new().where_starts_with("alias", "light").matches(&record()));
        assert!(!Query::new().where_starts_with("alias", "dark").matches(&record()));
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let q = Query::new().where_gt("height", 100i64).where_eq("is_active", false);
        assert!(!q.matches(&record()));

        let q = Query::new().where_gt("height", 100i64).where_eq("is_active", true);
        assert!(q.matches(&record()));
    }

    #[test]
    fn test_missing_attribute_never_matches() {
        assert!(!Query::new().where_eq("color", "#fff").matches(&record()));
        assert!(!Query::new().where_gt("fee_rate", 0i64).matches(&record()));
        assert!(!Query::new().where_starts_with("socket", "1").matches(&record()));
    }

    #[test]
    fn test_gt_mixed_kinds_is_false() {
        assert!(!Query::new().where_gt("height", "100").matches(&record()));
    }

    #[test]
    fn test_past_end() {
        let q = Query::new().prefix(vec![0x01]).upper_bound(vec![0x01, 0x80]);
        assert!(!q.past_end(&[0x01, 0x00]));
        assert!(!q.past_end(&[0x01, 0x80]));
        assert!(q.past_end(&[0x01, 0x81]));
        assert!(q.past_end(&[0x02]));
    }
}
