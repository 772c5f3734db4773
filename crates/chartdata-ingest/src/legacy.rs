//! Import of the legacy variable/entity-key JSON format.
//!
//! Each legacy variable is a set of parallel `years`/`entities`/`values`
//! arrays. The importer turns every variable into narrow rows and outer
//! joins them on `(time field, time, entity name)` into one wide table
//! with one column per variable.

use std::collections::{BTreeMap, HashMap};

use chartdata_model::{
    CellValue, ColumnSpec, DisplaySettings, EntityRegistry, Row, Schema, SourceInfo, Table,
    TimeField, annotation_slug, slugs,
};
use chartdata_time::{epoch_date, parse_iso_date};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::annotations::parse_entity_annotations;
use crate::error::{IngestError, Result};
use crate::slug::slugify;

/// Top-level legacy payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVariablesAndEntityKey {
    #[serde(default)]
    pub variables: BTreeMap<String, LegacyVariable>,
    #[serde(default)]
    pub entity_key: HashMap<i64, LegacyEntityMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyEntityMeta {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyVariable {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub short_unit: Option<String>,
    pub coverage: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub dataset_id: Option<String>,
    pub dataset_name: Option<String>,
    pub source: Option<SourceInfo>,
    pub display: DisplaySettings,
    pub years: Vec<i64>,
    pub entities: Vec<i64>,
    pub values: Vec<CellValue>,
}

/// Dataset ids arrive as either JSON numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

impl LegacyVariable {
    pub fn time_field(&self) -> TimeField {
        if self.display.year_is_day == Some(true) {
            TimeField::Day
        } else {
            TimeField::Year
        }
    }

    /// `"{id}-{slugified name}"`, unique even when names repeat.
    pub fn column_slug(&self) -> String {
        format!("{}-{}", self.id, slugify(&self.name))
    }

    pub fn column_spec(&self) -> ColumnSpec {
        ColumnSpec {
            slug: self.column_slug(),
            name: Some(self.name.clone()),
            owid_variable_id: Some(self.id),
            unit: self.unit.clone(),
            short_unit: self.short_unit.clone(),
            is_daily_measurement: self.display.year_is_day.unwrap_or(false),
            description: self.description.clone(),
            coverage: self.coverage.clone(),
            dataset_id: self.dataset_id.clone(),
            dataset_name: self.dataset_name.clone(),
            source: self.source.clone(),
            display: self.display.clone(),
        }
    }

    fn check_lengths(&self) -> Result<()> {
        let (years, entities, values) = (self.years.len(), self.entities.len(), self.values.len());
        if years != values || entities != values {
            return Err(IngestError::LengthMismatch {
                variable_id: self.id,
                years,
                entities,
                values,
            });
        }
        Ok(())
    }

    /// Signed day shift that re-bases this variable's days on `epoch`.
    fn day_shift(&self, epoch: NaiveDate) -> Result<i64> {
        if self.time_field() != TimeField::Day {
            return Ok(0);
        }
        let Some(zero_day) = self.display.zero_day.as_deref() else {
            return Ok(0);
        };
        let zero = parse_iso_date(zero_day).ok_or_else(|| IngestError::InvalidZeroDay {
            variable_id: self.id,
            value: zero_day.to_string(),
        })?;
        Ok((zero - epoch).num_days())
    }
}

/// Options for [`import_legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Day values are stored as offsets from this date.
    pub epoch: NaiveDate,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            epoch: epoch_date(),
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn with_epoch(mut self, epoch: NaiveDate) -> Self {
        self.epoch = epoch;
        self
    }
}

/// Result of a legacy import.
#[derive(Debug)]
pub struct LegacyImport {
    pub table: Table,
    /// Variables left out because their own data was inconsistent.
    pub skipped: Vec<IngestError>,
}

/// Parse a legacy JSON document and import it.
pub fn import_legacy_str(
    json: &str,
    registry: &mut EntityRegistry,
    options: &ImportOptions,
) -> Result<LegacyImport> {
    let input: LegacyVariablesAndEntityKey = serde_json::from_str(json)?;
    import_legacy(&input, registry, options)
}

/// Build a wide table from legacy variables.
///
/// Variables are processed in ascending id order. A variable whose
/// parallel arrays differ in length, that references an entity missing
/// from the entity key, or whose zero day cannot be parsed is left out and
/// reported in [`LegacyImport::skipped`]; the rest still import. Entity
/// ids from the entity key are recorded in `registry`.
pub fn import_legacy(
    input: &LegacyVariablesAndEntityKey,
    registry: &mut EntityRegistry,
    options: &ImportOptions,
) -> Result<LegacyImport> {
    let mut variables: Vec<&LegacyVariable> = input.variables.values().collect();
    variables.sort_by_key(|variable| variable.id);

    let mut schema: Schema = [slugs::ENTITY_NAME, slugs::ENTITY_ID, slugs::ENTITY_CODE]
        .into_iter()
        .map(ColumnSpec::new)
        .collect();
    let mut joiner = RowJoiner::default();
    let mut skipped = Vec::new();

    for variable in variables {
        let rows = match narrow_rows(variable, &input.entity_key, options) {
            Ok(rows) => rows,
            Err(error) if error.is_variable_local() => {
                warn!(variable_id = variable.id, %error, "skipping legacy variable");
                skipped.push(error);
                continue;
            }
            Err(error) => return Err(error),
        };

        for &entity_id in &variable.entities {
            if let Some(meta) = input.entity_key.get(&entity_id) {
                registry.register_with_id(
                    entity_id,
                    &meta.name,
                    meta.code.as_deref().unwrap_or_default(),
                )?;
            }
        }

        let spec = variable.column_spec();
        let time_slug = variable.time_field().slug();
        if !schema.contains(time_slug) {
            schema.insert(ColumnSpec::new(time_slug));
        }
        let slug = spec.slug.clone();
        schema.insert(spec);
        if variable.display.entity_annotations_map.is_some() {
            schema.insert(ColumnSpec::new(annotation_slug(&slug)));
        }

        debug!(
            variable_id = variable.id,
            slug = %slug,
            rows = rows.len(),
            "imported legacy variable"
        );
        for (key, row) in rows {
            joiner.add(key, row);
        }
    }

    let rows = joiner.finish();
    info!(
        rows = rows.len(),
        columns = schema.len(),
        skipped = skipped.len(),
        "legacy import complete"
    );
    let table = Table::with_schema(rows, schema)?;
    Ok(LegacyImport { table, skipped })
}

type JoinKey = (TimeField, i64, String);

/// One narrow row per value of `variable`, keyed for the join.
fn narrow_rows(
    variable: &LegacyVariable,
    entity_key: &HashMap<i64, LegacyEntityMeta>,
    options: &ImportOptions,
) -> Result<Vec<(JoinKey, Row)>> {
    variable.check_lengths()?;
    let shift = variable.day_shift(options.epoch)?;
    let time_field = variable.time_field();
    let slug = variable.column_slug();
    let annotations = variable
        .display
        .entity_annotations_map
        .as_deref()
        .map(|text| (annotation_slug(&slug), parse_entity_annotations(text)));

    let mut rows = Vec::with_capacity(variable.values.len());
    for ((&year, &entity_id), value) in variable
        .years
        .iter()
        .zip(&variable.entities)
        .zip(&variable.values)
    {
        let meta = entity_key
            .get(&entity_id)
            .ok_or(IngestError::UnknownEntity {
                variable_id: variable.id,
                entity_id,
            })?;
        let time = year + shift;
        let mut row = Row::new()
            .with(time_field.slug(), time)
            .with(slug.as_str(), value.clone())
            .with(slugs::ENTITY_NAME, meta.name.as_str())
            .with(slugs::ENTITY_ID, entity_id)
            .with(slugs::ENTITY_CODE, meta.code.clone());
        if let Some((notes_slug, notes)) = &annotations {
            row.set(notes_slug.as_str(), notes.get(&meta.name).cloned());
        }
        rows.push(((time_field, time, meta.name.clone()), row));
    }
    Ok(rows)
}

/// Hash-keyed outer join that keeps first-seen key order.
#[derive(Default)]
struct RowJoiner {
    rows: Vec<Row>,
    index: HashMap<JoinKey, usize>,
}

impl RowJoiner {
    fn add(&mut self, key: JoinKey, row: Row) {
        match self.index.get(&key) {
            Some(&position) => self.rows[position].merge(row),
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(row);
            }
        }
    }

    fn finish(self) -> Vec<Row> {
        self.rows
    }
}
