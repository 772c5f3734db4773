//! Column metadata.

use serde::{Deserialize, Serialize};

/// Where a column's data came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_published_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_publisher_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Display formatting for a column.
///
/// These are the only column settings that may change after the column is
/// registered (see [`Table::update_display`](crate::Table::update_display)).
/// `year_is_day`, `zero_day` and `entity_annotations_map` are read by the
/// legacy importer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_projection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_decimal_places: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_is_day: Option<bool>,
    /// ISO date that day value 0 refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_day: Option<String>,
    /// Newline-delimited `Entity: note` lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_annotations_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_in_table: Option<bool>,
}

/// Metadata for one column, keyed by its unique slug.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSpec {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owid_variable_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_unit: Option<String>,
    pub is_daily_measurement: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    pub display: DisplaySettings,
}

impl ColumnSpec {
    /// A bare spec carrying only a slug.
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_variable_id(mut self, id: i64) -> Self {
        self.owid_variable_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_daily_measurement(mut self, daily: bool) -> Self {
        self.is_daily_measurement = daily;
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: DisplaySettings) -> Self {
        self.display = display;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = Some(source);
        self
    }

    /// The name shown to readers: `name` if set, otherwise the slug.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.slug)
    }
}
