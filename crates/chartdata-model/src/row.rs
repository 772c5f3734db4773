use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::cell::{CellValue, MISSING};
use crate::schema::slugs;

/// A row as a slug-keyed record.
///
/// Rows are the exchange format at the edges of a [`Table`](crate::Table):
/// importers build them, the table stores them column-wise, and exports
/// turn them back into records. Keys keep their insertion order so that a
/// detected schema follows the order fields were written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Row::set`].
    #[must_use]
    pub fn with(mut self, slug: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(slug, value);
        self
    }

    /// Set a cell, replacing any previous value in place.
    pub fn set(&mut self, slug: impl Into<String>, value: impl Into<CellValue>) {
        let slug = slug.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(key, _)| *key == slug) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((slug, value)),
        }
    }

    pub fn get(&self, slug: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(key, _)| key == slug)
            .map(|(_, value)| value)
    }

    /// The cell for `slug`, or `Missing` when the key is absent.
    pub fn value(&self, slug: &str) -> &CellValue {
        self.get(slug).unwrap_or(&MISSING)
    }

    pub fn number(&self, slug: &str) -> Option<f64> {
        self.value(slug).as_number()
    }

    pub fn text(&self, slug: &str) -> Option<&str> {
        self.value(slug).as_text()
    }

    pub fn remove(&mut self, slug: &str) -> Option<CellValue> {
        let position = self.cells.iter().position(|(key, _)| key == slug)?;
        Some(self.cells.remove(position).1)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.text(slugs::ENTITY_NAME)
    }

    /// Shallow union: cells from `other` overwrite cells with the same key.
    pub fn merge(&mut self, other: Row) {
        for (slug, value) in other.cells {
            self.set(slug, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl IntoIterator for Row {
    type Item = (String, CellValue);
    type IntoIter = std::vec::IntoIter<(String, CellValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (slug, value) in iter {
            row.set(slug, value);
        }
        row
    }
}

/// Serializes as a JSON-style object; missing cells are left out.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let defined = self.cells.iter().filter(|(_, value)| value.is_defined());
        let mut map = serializer.serialize_map(Some(defined.clone().count()))?;
        for (slug, value) in defined {
            map.serialize_entry(slug, value)?;
        }
        map.end()
    }
}
