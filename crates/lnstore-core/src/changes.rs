//! Attribute-level change operations
//!
//! An update is expressed as a [`Changes`] map from attribute to [`Change`],
//! applied to a decoded copy of the stored record. Expectations are checked
//! against the stored record before any change is applied.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::value::{Record, Value, REV};

/// One attribute-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Replace the value
    Set(Value),
    /// Append to a list, or add to an integer
    Add(Value),
    /// Make the attribute undefined
    Remove,
}

/// Set of changes to apply in one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes(BTreeMap<String, Change>);

impl Changes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, attr: impl Into<String>, change: Change) {
        self.0.insert(attr.into(), change);
    }

    pub fn set(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(attr, Change::Set(value.into()));
        self
    }

    pub fn add(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(attr, Change::Add(value.into()));
        self
    }

    pub fn remove(mut self, attr: impl Into<String>) -> Self {
        self.insert(attr, Change::Remove);
        self
    }

    /// Add the `_rev` increment every update carries.
    pub fn bump_rev(self) -> Self {
        self.add(REV, 1i64)
    }

    pub fn get(&self, attr: &str) -> Option<&Change> {
        self.0.get(attr)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Change> {
        self.0.iter()
    }

    /// Apply every change to a copy of `record`.
    ///
    /// Fails without touching anything when a change does not fit the stored
    /// value (adding text to an integer, overflowing an integer).
    pub fn apply(&self, record: &Record) -> StoreResult<Record> {
        let mut updated = record.clone();

        for (attr, change) in &self.0 {
            match change {
                Change::Set(value) => updated.set(attr.clone(), value.clone()),
                Change::Remove => {
                    updated.remove(attr);
                }
                Change::Add(value) => {
                    let next = add_value(attr, updated.get(attr), value)?;
                    updated.set(attr.clone(), next);
                }
            }
        }

        Ok(updated)
    }
}

impl<'a> IntoIterator for &'a Changes {
    type Item = (&'a String, &'a Change);
    type IntoIter = btree_map::Iter<'a, String, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn add_value(attr: &str, current: Option<&Value>, value: &Value) -> StoreResult<Value> {
    match (current, value) {
        (None, _) => Ok(value.clone()),
        (Some(Value::List(items)), Value::List(more)) => {
            let mut items = items.clone();
            items.extend(more.iter().cloned());
            Ok(Value::List(items))
        }
        (Some(Value::List(items)), item) => {
            let mut items = items.clone();
            items.push(item.clone());
            Ok(Value::List(items))
        }
        (Some(Value::Int(a)), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| StoreError::validation(format!("adding {} to `{}` overflows", b, attr))),
        (Some(current), value) => Err(StoreError::validation(format!(
            "cannot add {} to {} attribute `{}`",
            value.kind(),
            current.kind(),
            attr
        ))),
    }
}

/// First attribute of `expect` whose stored value differs, if any.
///
/// Lists compare as sets. An attribute missing from the stored record never
/// matches.
pub fn expect_mismatch<'a>(stored: &Record, expect: &'a Record) -> Option<&'a str> {
    expect
        .iter()
        .find(|(attr, expected)| match stored.get(attr) {
            Some(actual) => !actual.set_eq(expected),
            None => true,
        })
        .map(|(attr, _)| attr.as_str())
}
