//! Record value model
//!
//! A [`Record`] is a flat map from attribute name to [`Value`]. An attribute
//! that is missing from the map is undefined; there is no explicit null.
//! Lists are ordered on disk but compared as sets wherever records are
//! matched against each other.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// Revision attribute carried by every stored record.
pub const REV: &str = "_rev";

/// Closed set of attribute value kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the value kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    /// Equality where two lists match when they hold the same members,
    /// regardless of order or repetition.
    pub fn set_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            _ => self == other,
        }
    }

    /// List of byte strings.
    pub fn bytes_list<I, B>(items: I) -> Value
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Value::List(items.into_iter().map(|b| Value::Bytes(b.into())).collect())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

macro_rules! list_from_vec {
    ($($elem:ty),*) => {
        $(
            impl From<Vec<$elem>> for Value {
                fn from(items: Vec<$elem>) -> Self {
                    Value::List(items.into_iter().map(Value::from).collect())
                }
            }
        )*
    };
}

list_from_vec!(Value, i64, u32, String, &str);

/// Flat attribute map stored under one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.0.get(attr)
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.0.contains_key(attr)
    }

    pub fn set(&mut self, attr: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(attr.into(), value.into());
    }

    /// Set `attr` when `value` is present, otherwise leave it undefined.
    pub fn set_opt<V: Into<Value>>(&mut self, attr: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.set(attr, value);
        }
    }

    pub fn remove(&mut self, attr: &str) -> Option<Value> {
        self.0.remove(attr)
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attr, value);
        self
    }

    /// Builder form of [`Record::set_opt`].
    pub fn with_opt<V: Into<Value>>(mut self, attr: impl Into<String>, value: Option<V>) -> Self {
        self.set_opt(attr, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Current revision, if the record carries one.
    pub fn rev(&self) -> Option<i64> {
        self.get(REV).and_then(Value::as_int)
    }

    /// Copy holding only the listed attributes that are defined here.
    pub fn project(&self, attrs: &[&str]) -> Record {
        attrs
            .iter()
            .filter_map(|attr| self.0.get(*attr).map(|v| ((*attr).to_owned(), v.clone())))
            .collect()
    }

    /// Copy without the named attribute.
    pub fn without(&self, attr: &str) -> Record {
        let mut copy = self.clone();
        copy.remove(attr);
        copy
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_eq_ignores_order_and_repeats() {
        let a = Value::from(vec![1i64, 2, 3]);
        let b = Value::from(vec![3i64, 1, 2, 2]);
        let c = Value::from(vec![1i64, 2]);
        assert!(a.set_eq(&b));
        assert!(!a.set_eq(&c));
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_eq_scalars() {
        assert!(Value::from("x").set_eq(&Value::from("x")));
        assert!(!Value::Int(1).set_eq(&Value::Bool(true)));
        assert!(!Value::from(vec![1i64]).set_eq(&Value::Int(1)));
    }

    #[test]
    fn test_record_builders() {
        let record = Record::new()
            .with("alias", "node")
            .with(REV, 4i64)
            .with_opt("socket", None::<String>)
            .with_opt("features", Some(vec![1u32, 9]));

        assert_eq!(record.len(), 3);
        assert!(!record.contains("socket"));
        assert_eq!(record.rev(), Some(4));
        assert_eq!(
            record.get("features"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(9)]))
        );
    }

    #[test]
    fn test_project_and_without() {
        let record = Record::new().with("a", 1i64).with("b", 2i64).with(REV, 0i64);

        let projected = record.project(&["a", "missing"]);
        assert_eq!(projected, Record::new().with("a", 1i64));

        let stripped = record.without(REV);
        assert_eq!(stripped.rev(), None);
        assert_eq!(stripped.len(), 2);
    }

    #[test]
    fn test_bytes_and_bytes_list() {
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
        let list = Value::bytes_list(vec![vec![1u8], vec![2u8]]);
        assert_eq!(list.as_list().map(|l| l.len()), Some(2));
    }
}
