//! Copy-on-write patching for loosely-typed listing fields.
//!
//! Fields the server sends that the draft does not model explicitly are kept
//! in a [`FieldMap`]. Updating a nested path produces a new map that shares
//! every untouched entry with its predecessor, so sibling subtrees keep
//! their identity across edits (observable with [`std::sync::Arc::ptr_eq`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A plain JSON-shaped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(FieldMap),
}

impl FieldValue {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A persistent string-keyed map. Entries are reference-counted so that
/// cloning the map is shallow and updates share unchanged values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, Arc<FieldValue>>);

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<FieldValue>> {
        self.0.get(key)
    }

    /// Walks a path of keys through nested maps.
    #[must_use]
    pub fn get_path(&self, segments: &[&str]) -> Option<&Arc<FieldValue>> {
        let (first, rest) = segments.split_first()?;
        let entry = self.0.get(*first)?;
        if rest.is_empty() {
            return Some(entry);
        }
        match entry.as_ref() {
            FieldValue::Map(inner) => inner.get_path(rest),
            _ => None,
        }
    }

    /// Returns a new map with `value` written at `segments`. Maps along the
    /// path are shallow-cloned; missing or non-map intermediates become
    /// fresh empty maps. Everything off the path is shared, not copied.
    #[must_use]
    pub fn with_path(&self, segments: &[&str], value: FieldValue) -> Self {
        let mut next = self.clone();
        match segments {
            [] => {}
            [leaf] => {
                next.0.insert((*leaf).to_string(), Arc::new(value));
            }
            [head, rest @ ..] => {
                let child = match next.0.get(*head).map(Arc::as_ref) {
                    Some(FieldValue::Map(inner)) => inner.clone(),
                    _ => FieldMap::new(),
                };
                let updated = child.with_path(rest, value);
                next.0
                    .insert((*head).to_string(), Arc::new(FieldValue::Map(updated)));
            }
        }
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<FieldValue>)> {
        self.0.iter()
    }
}

/// Splits a dot-separated field path into its segments.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}
