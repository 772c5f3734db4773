//! Population reference data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Read-only entity name to population lookup.
///
/// Deserializes from a plain JSON object (`{"France": 67000000, ...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationMap(BTreeMap<String, f64>);

impl PopulationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: &str) -> Option<f64> {
        self.0.get(entity).copied()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.0.contains_key(entity)
    }

    pub fn insert(&mut self, entity: impl Into<String>, population: f64) {
        self.0.insert(entity.into(), population);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, population)| (name.as_str(), *population))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PopulationMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
