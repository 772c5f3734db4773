use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chartdata_time::TimeUnit;

use crate::cell::CellValue;
use crate::schema::TimeField;
use crate::spec::{ColumnSpec, DisplaySettings};

/// Read-only view of one column.
///
/// Covers the rows where the column's cell is defined and the row is not
/// filtered. [`values`](Self::values), [`times`](Self::times) and
/// [`entity_names`](Self::entity_names) are parallel: position `i` in each
/// refers to the same table row. The view is taken when
/// [`Table::column`](crate::Table::column) is called and does not follow
/// later changes to the table.
#[derive(Debug, Clone)]
pub struct Column {
    spec: ColumnSpec,
    time_field: TimeField,
    cells: Arc<Vec<CellValue>>,
    entity_names: Arc<Vec<CellValue>>,
    rows: Vec<usize>,
    times: Vec<i64>,
}

impl Column {
    pub(crate) fn new(
        spec: ColumnSpec,
        time_field: TimeField,
        cells: Arc<Vec<CellValue>>,
        entity_names: Arc<Vec<CellValue>>,
        rows: Vec<usize>,
        times: Vec<i64>,
    ) -> Self {
        Self {
            spec,
            time_field,
            cells,
            entity_names,
            rows,
            times,
        }
    }

    pub fn slug(&self) -> &str {
        &self.spec.slug
    }

    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.display_name()
    }

    pub fn unit(&self) -> Option<&str> {
        self.spec.unit.as_deref()
    }

    pub fn short_unit(&self) -> Option<&str> {
        self.spec.short_unit.as_deref()
    }

    pub fn display(&self) -> &DisplaySettings {
        &self.spec.display
    }

    pub fn is_daily_measurement(&self) -> bool {
        self.spec.is_daily_measurement
    }

    pub fn time_field(&self) -> TimeField {
        self.time_field
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Table row positions backing this view.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(|&row| &self.cells[row])
    }

    /// Numeric values only; text cells are skipped.
    pub fn numbers(&self) -> Vec<f64> {
        self.values().filter_map(CellValue::as_number).collect()
    }

    /// Year or day value of each row.
    pub fn times(&self) -> &[i64] {
        &self.times
    }

    /// Time values as calendar units.
    pub fn time_units(&self) -> Vec<Option<TimeUnit>> {
        self.times
            .iter()
            .map(|&time| self.time_field.to_time_unit(time))
            .collect()
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(|&row| self.entity_names[row].as_text().unwrap_or_default())
    }

    /// Distinct entities in first-seen order.
    pub fn entities_uniq(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entity_names()
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Last value seen for each entity.
    pub fn entity_map(&self) -> BTreeMap<&str, &CellValue> {
        self.entity_names().zip(self.values()).collect()
    }
}
