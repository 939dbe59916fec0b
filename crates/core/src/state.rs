//! Request-state attribute bag and typed path lookup.
//!
//! The host pipeline hands each authentication request over as a bag of
//! previously established values: top-level entries such as
//! `saml:RequesterID` or `core:SP`, plus the nested `Attributes` map
//! holding the released user attributes. Lookups are addressed by an
//! [`AttributePath`] of at most two levels, and the derivation pipeline
//! appends its output back into the `Attributes` map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level key of the nested attribute map.
pub const ATTRIBUTES_KEY: &str = "Attributes";

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// A reference into the request state, at most two levels deep.
///
/// `"UserID"` addresses a top-level entry; `"Attributes/uid"` addresses
/// the `uid` attribute inside the top-level `Attributes` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// Top-level state key.
    pub key: String,
    /// Nested key inside a map entry, when addressing the second level.
    pub sub: Option<String>,
}

impl AttributePath {
    /// Path addressing a top-level entry.
    pub fn top(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sub: None,
        }
    }

    /// Path addressing a nested key inside a top-level map entry.
    pub fn nested(key: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sub: Some(sub.into()),
        }
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sub {
            Some(sub) => write!(f, "{}/{}", self.key, sub),
            None => write!(f, "{}", self.key),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One attribute's value(s). Hosts may deliver a scalar where a list is
/// expected; a scalar is treated as a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValues {
    One(String),
    Many(Vec<String>),
}

impl AttributeValues {
    /// The first value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value.as_str()),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// One top-level entry in the request state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateEntry {
    /// A nested attribute map (e.g. the `Attributes` collection).
    Map(BTreeMap<String, AttributeValues>),
    /// A plain value or value list at the top level.
    Values(AttributeValues),
}

// ---------------------------------------------------------------------------
// RequestState
// ---------------------------------------------------------------------------

/// The mutable per-request attribute bag.
///
/// Created fresh per incoming authentication request; the generator reads
/// it through [`AttributePath`] lookups and mutates it only by writing
/// derived tokens into the nested `Attributes` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestState {
    entries: BTreeMap<String, StateEntry>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a top-level entry.
    pub fn insert(&mut self, key: impl Into<String>, entry: StateEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Look up a single path.
    ///
    /// Returns the first value of the addressed entry. A nested key into a
    /// plain value, or a map addressed without a nested key, does not
    /// resolve.
    pub fn lookup(&self, path: &AttributePath) -> Option<&str> {
        let entry = self.entries.get(&path.key)?;
        match (entry, &path.sub) {
            (StateEntry::Values(values), None) => values.first(),
            (StateEntry::Map(map), Some(sub)) => map.get(sub)?.first(),
            _ => None,
        }
    }

    /// Values under `name` in the nested `Attributes` map, if any.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValues> {
        match self.entries.get(ATTRIBUTES_KEY)? {
            StateEntry::Map(map) => map.get(name),
            StateEntry::Values(_) => None,
        }
    }

    /// Reset `name` in the `Attributes` map to an empty value list,
    /// creating the map itself when the state has none.
    pub fn reset_attribute(&mut self, name: &str) {
        self.attributes_mut()
            .insert(name.to_string(), AttributeValues::Many(Vec::new()));
    }

    /// Append a value to `name` in the `Attributes` map.
    pub fn append_attribute(&mut self, name: &str, value: String) {
        let map = self.attributes_mut();
        match map.remove(name) {
            Some(AttributeValues::Many(mut values)) => {
                values.push(value);
                map.insert(name.to_string(), AttributeValues::Many(values));
            }
            Some(AttributeValues::One(first)) => {
                map.insert(name.to_string(), AttributeValues::Many(vec![first, value]));
            }
            None => {
                map.insert(name.to_string(), AttributeValues::Many(vec![value]));
            }
        }
    }

    /// The nested `Attributes` map, created (or rebuilt, when a host left
    /// a plain value under the key) on first use.
    fn attributes_mut(&mut self) -> &mut BTreeMap<String, AttributeValues> {
        let entry = self
            .entries
            .entry(ATTRIBUTES_KEY.to_string())
            .or_insert_with(|| StateEntry::Map(BTreeMap::new()));
        if !matches!(entry, StateEntry::Map(_)) {
            *entry = StateEntry::Map(BTreeMap::new());
        }
        match entry {
            StateEntry::Map(map) => map,
            StateEntry::Values(_) => unreachable!("entry was just replaced with a map"),
        }
    }
}

/// Resolve the first candidate path that yields a non-empty value.
///
/// Candidates are tried in order; the scan stops at the first non-empty
/// hit and later candidates are never inspected. Entries that resolve to
/// an empty string do not win.
pub fn resolve_first<'a>(state: &'a RequestState, paths: &[AttributePath]) -> Option<&'a str> {
    paths
        .iter()
        .filter_map(|path| state.lookup(path))
        .find(|value| !value.is_empty())
}
