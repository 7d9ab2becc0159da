//! Feature snapshot captured when an entry is accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Condition name → computed value, for every non-Off condition that
/// produced a value during the entry pass.
///
/// Non-finite values are never stored, so every entry can be bucketed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSnapshot {
    values: BTreeMap<String, f64>,
}

impl FeatureSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Non-finite values are dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.values.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
