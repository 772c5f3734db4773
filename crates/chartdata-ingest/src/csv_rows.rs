//! Normalization of wide CSV records into table rows.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use chartdata_model::{CellValue, EntityRegistry, Row, Table, slugs};
use chartdata_time::{date_to_day_offset, epoch_date, parse_iso_date};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// One decoded CSV record: header and raw field text, in column order.
pub type CsvRecord = Vec<(String, String)>;

/// How raw CSV records map onto table rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRowOptions {
    /// Fields kept as text; every other field is parsed as a number.
    pub known_strings: BTreeSet<String>,
    /// Field holding the entity name.
    pub location_key: String,
    /// Field holding the entity code.
    pub code_key: String,
    /// Field holding the ISO observation date.
    pub date_key: String,
    /// Field holding the continent label; empty values become missing.
    pub continent_key: String,
    /// Day values are stored as offsets from this date.
    pub epoch: NaiveDate,
    /// Codes used for locations whose code field is empty.
    pub sentinel_codes: BTreeMap<String, String>,
    /// Locations whose rows are discarded.
    pub dropped_locations: BTreeSet<String>,
}

impl Default for CsvRowOptions {
    fn default() -> Self {
        Self {
            known_strings: ["iso_code", "location", "date", "tests_units", "continent"]
                .into_iter()
                .map(String::from)
                .collect(),
            location_key: "location".to_string(),
            code_key: "iso_code".to_string(),
            date_key: "date".to_string(),
            continent_key: "continent".to_string(),
            epoch: epoch_date(),
            sentinel_codes: [("World", "OWID_WRL"), ("International", "OWID_INT")]
                .into_iter()
                .map(|(name, code)| (name.to_string(), code.to_string()))
                .collect(),
            dropped_locations: BTreeSet::new(),
        }
    }
}

impl CsvRowOptions {
    #[must_use]
    pub fn with_known_string(mut self, key: impl Into<String>) -> Self {
        self.known_strings.insert(key.into());
        self
    }

    #[must_use]
    pub fn with_epoch(mut self, epoch: NaiveDate) -> Self {
        self.epoch = epoch;
        self
    }

    #[must_use]
    pub fn with_dropped_location(mut self, location: impl Into<String>) -> Self {
        self.dropped_locations.insert(location.into());
        self
    }

    #[must_use]
    pub fn with_sentinel_code(
        mut self,
        location: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.sentinel_codes.insert(location.into(), code.into());
        self
    }
}

/// Decode CSV text into records. The first line is the header.
pub fn read_csv_records<R: Read>(reader: R) -> Result<Vec<CsvRecord>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().trim_matches('\u{feff}').to_string())
        .collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }
    debug!(records = records.len(), columns = headers.len(), "read CSV records");
    Ok(records)
}

/// Turn raw records into rows carrying entity identity and a `day` field.
///
/// The location field becomes `entityName`, the code field `entityCode`
/// and the date field `day`; each is removed under its raw name. Entity
/// ids come from `registry`, first seen wins. Rows for dropped locations
/// are discarded before any id is assigned.
pub fn normalize_csv_rows(
    records: impl IntoIterator<Item = CsvRecord>,
    registry: &mut EntityRegistry,
    options: &CsvRowOptions,
) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (index, record) in records.into_iter().enumerate() {
        let location = record
            .iter()
            .find(|(key, _)| *key == options.location_key)
            .map(|(_, value)| value.trim().to_string());
        if location
            .as_deref()
            .is_some_and(|name| options.dropped_locations.contains(name))
        {
            dropped += 1;
            continue;
        }
        rows.push(normalize_record(index, record, registry, options)?);
    }
    debug!(rows = rows.len(), dropped, "normalized CSV rows");
    Ok(rows)
}

fn normalize_record(
    index: usize,
    record: CsvRecord,
    registry: &mut EntityRegistry,
    options: &CsvRowOptions,
) -> Result<Row> {
    let mut row: Row = record
        .into_iter()
        .map(|(key, raw)| {
            let value = if options.known_strings.contains(&key) {
                CellValue::Text(raw.trim().to_string())
            } else {
                parse_number(&raw)
            };
            (key, value)
        })
        .collect();

    let name = match row.remove(&options.location_key) {
        Some(CellValue::Text(name)) if !name.is_empty() => name,
        _ => {
            return Err(IngestError::MissingField {
                row: index,
                field: options.location_key.clone(),
            });
        }
    };

    let code = match row.remove(&options.code_key) {
        Some(CellValue::Text(code)) if !code.is_empty() => Some(code),
        _ => options.sentinel_codes.get(&name).cloned(),
    };

    let day = match row.remove(&options.date_key) {
        Some(CellValue::Text(date)) => match parse_iso_date(&date) {
            Some(date) => date_to_day_offset(date, options.epoch),
            None => {
                return Err(IngestError::InvalidDate {
                    row: index,
                    value: date,
                });
            }
        },
        Some(other) => {
            return Err(IngestError::InvalidDate {
                row: index,
                value: other.to_string(),
            });
        }
        None => {
            return Err(IngestError::MissingField {
                row: index,
                field: options.date_key.clone(),
            });
        }
    };

    if row.text(&options.continent_key) == Some("") {
        row.set(options.continent_key.as_str(), CellValue::Missing);
    }

    let id = registry.register(&name, code.as_deref().unwrap_or_default())?;
    let mut normalized = Row::new()
        .with(slugs::ENTITY_NAME, name)
        .with(slugs::ENTITY_ID, id)
        .with(slugs::ENTITY_CODE, code)
        .with(slugs::DAY, day);
    normalized.merge(row);
    Ok(normalized)
}

fn parse_number(raw: &str) -> CellValue {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .into()
}

/// Read, normalize and load CSV text into a table.
pub fn read_csv_table<R: Read>(
    reader: R,
    registry: &mut EntityRegistry,
    options: &CsvRowOptions,
) -> Result<Table> {
    let records = read_csv_records(reader)?;
    let rows = normalize_csv_rows(records, registry, options)?;
    let table = Table::new(rows)?;
    info!(
        rows = table.len(),
        columns = table.schema().len(),
        entities = registry.len(),
        "loaded CSV table"
    );
    Ok(table)
}
