//! Dynamic property values.
//!
//! The source this crate is modeled on carries free-form `any` property
//! maps. Rather than reaching for `Box<dyn Any>`, we model that dynamism as
//! a closed tagged union (per the reimplementation note in spec.md §9): a
//! statically checked surface that still lets callers build arbitrary
//! nested property maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single property value in an event's property map.
///
/// `BTreeMap` (rather than `HashMap`) backs [`PropertyValue::Map`] so that
/// property maps have a stable iteration order, which matters for the
/// property-value equality checks `propertyValues` filtering relies on and
/// for deterministic test fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Map(PropertyMap),
    Null,
}

/// An event's or candidate template's free-form property mapping.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        // Exact for any i64 within the range actually used by property
        // values (ids, counts); spec has no integer-precision requirement
        // beyond "free-form property mapping".
        Self::Number(n as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_order_stable() {
        let mut m: PropertyMap = PropertyMap::new();
        m.insert("b".into(), "2".into());
        m.insert("a".into(), "1".into());
        let keys: Vec<_> = m.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn conversions_build_expected_variants() {
        assert_eq!(PropertyValue::from("x"), PropertyValue::String("x".into()));
        assert_eq!(PropertyValue::from(true), PropertyValue::Bool(true));
        assert_eq!(PropertyValue::from(3_i64), PropertyValue::Number(3.0));
    }
}
