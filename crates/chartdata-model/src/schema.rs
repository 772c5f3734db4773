//! Slug-keyed column schema.

use std::collections::HashMap;

use chartdata_time::{TimeUnit, day_offset_to_date, epoch_date};
use serde::{Deserialize, Serialize};

use crate::row::Row;
use crate::spec::ColumnSpec;

/// Slugs with fixed meaning in every table.
pub mod slugs {
    pub const ENTITY_NAME: &str = "entityName";
    pub const ENTITY_ID: &str = "entityId";
    pub const ENTITY_CODE: &str = "entityCode";
    pub const YEAR: &str = "year";
    pub const DAY: &str = "day";

    /// Identity and time slugs that `add_column` may not overwrite.
    pub const PROTECTED: [&str; 5] = [ENTITY_NAME, ENTITY_ID, ENTITY_CODE, YEAR, DAY];

    pub const ANNOTATIONS_SUFFIX: &str = "-annotations";
}

pub fn is_protected_slug(slug: &str) -> bool {
    slugs::PROTECTED.contains(&slug)
}

/// Slug of the companion column holding per-entity notes for `slug`.
pub fn annotation_slug(slug: &str) -> String {
    format!("{slug}{}", slugs::ANNOTATIONS_SUFFIX)
}

/// Which field carries a row's time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeField {
    Year,
    Day,
}

impl TimeField {
    pub fn slug(self) -> &'static str {
        match self {
            TimeField::Year => slugs::YEAR,
            TimeField::Day => slugs::DAY,
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            slugs::YEAR => Some(TimeField::Year),
            slugs::DAY => Some(TimeField::Day),
            _ => None,
        }
    }

    /// Interpret a stored time value as a calendar unit.
    ///
    /// Day values are offsets from the process epoch.
    pub fn to_time_unit(self, value: i64) -> Option<TimeUnit> {
        match self {
            TimeField::Year => i32::try_from(value).ok().map(TimeUnit::year),
            TimeField::Day => day_offset_to_date(value, epoch_date()).map(TimeUnit::from_date),
        }
    }

    /// The time field set on `row`, if exactly one is present.
    pub fn of_row(row: &Row) -> Option<Self> {
        let year = row.value(slugs::YEAR).is_defined();
        let day = row.value(slugs::DAY).is_defined();
        match (year, day) {
            (true, false) => Some(TimeField::Year),
            (false, true) => Some(TimeField::Day),
            _ => None,
        }
    }
}

/// Ordered set of column specs.
///
/// Order is insertion order and determines the export column order.
/// Inserting a spec whose slug is already present replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of all keys across `rows`, in first-seen order.
    pub fn detect(rows: &[Row]) -> Self {
        let mut schema = Schema::new();
        for row in rows {
            for slug in row.keys() {
                if !schema.contains(slug) {
                    schema.insert(ColumnSpec::new(slug));
                }
            }
        }
        schema
    }

    /// Register `spec`, returning its position.
    pub fn insert(&mut self, spec: ColumnSpec) -> usize {
        if let Some(&position) = self.index.get(&spec.slug) {
            self.specs[position] = spec;
            return position;
        }
        let position = self.specs.len();
        self.index.insert(spec.slug.clone(), position);
        self.specs.push(spec);
        position
    }

    pub fn get(&self, slug: &str) -> Option<&ColumnSpec> {
        self.position(slug).map(|position| &self.specs[position])
    }

    pub(crate) fn get_mut(&mut self, slug: &str) -> Option<&mut ColumnSpec> {
        let position = self.position(slug)?;
        self.specs.get_mut(position)
    }

    pub fn position(&self, slug: &str) -> Option<usize> {
        self.index.get(slug).copied()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.index.contains_key(slug)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.slug.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<ColumnSpec> for Schema {
    fn from_iter<I: IntoIterator<Item = ColumnSpec>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for spec in iter {
            schema.insert(spec);
        }
        schema
    }
}
