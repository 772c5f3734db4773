//! Columnar table storage.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cell::{CellValue, MISSING};
use crate::column::Column;
use crate::error::{Result, TableError};
use crate::population::PopulationMap;
use crate::row::Row;
use crate::schema::{Schema, TimeField, annotation_slug, is_protected_slug, slugs};
use crate::spec::{ColumnSpec, DisplaySettings};

/// The most recent filter passed to [`Table::apply_filters`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub selected: BTreeSet<String>,
    pub min_population: Option<f64>,
}

/// An in-memory table of entity/time observations.
///
/// Cells are stored column-wise, one array per schema entry, all of
/// length [`len`](Self::len). Column arrays are reference counted: a
/// [`Column`] view holds its own snapshot and is unaffected by later
/// mutations of the table.
///
/// Every row carries an `entityName` and exactly one of `year`/`day`, and
/// rows sharing an `entityName` agree on `entityId` and `entityCode`.
/// Both are checked whenever rows enter the table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    schema: Schema,
    columns: Vec<Arc<Vec<CellValue>>>,
    row_count: usize,
    filtered: Vec<bool>,
    filter: Option<FilterState>,
}

type Identity = (CellValue, CellValue);

impl Table {
    /// Build a table whose schema is the union of all row keys.
    pub fn new(rows: Vec<Row>) -> Result<Self> {
        let schema = Schema::detect(&rows);
        Self::with_schema(rows, schema)
    }

    /// Build a table against an explicit schema.
    ///
    /// Row keys the schema does not name are dropped. Column views need
    /// `entityName` and the rows' time slug, so those are put ahead of the
    /// given specs when the schema lacks them.
    pub fn with_schema(rows: Vec<Row>, schema: Schema) -> Result<Self> {
        let mut identities = HashMap::new();
        validate_rows(&rows, 0, &mut identities)?;
        let schema = with_required_slugs(schema, &rows);

        let row_count = rows.len();
        let mut columns: Vec<Vec<CellValue>> = (0..schema.len())
            .map(|_| vec![CellValue::Missing; row_count])
            .collect();
        for (index, row) in rows.into_iter().enumerate() {
            for (slug, value) in row {
                if let Some(position) = schema.position(&slug) {
                    columns[position][index] = value;
                }
            }
        }
        debug!(rows = row_count, columns = schema.len(), "built table");
        Ok(Self {
            schema,
            columns: columns.into_iter().map(Arc::new).collect(),
            row_count,
            filtered: vec![false; row_count],
            filter: None,
        })
    }

    /// Append rows, registering any slugs the schema does not know yet.
    ///
    /// New rows start unfiltered until the next [`apply_filters`](Self::apply_filters).
    pub fn append_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        let mut identities = self.identities();
        validate_rows(&rows, self.row_count, &mut identities)?;

        for row in &rows {
            for slug in row.keys() {
                if !self.schema.contains(slug) {
                    self.schema.insert(ColumnSpec::new(slug));
                    self.columns
                        .push(Arc::new(vec![CellValue::Missing; self.row_count]));
                }
            }
        }

        let start = self.row_count;
        let added = rows.len();
        self.row_count += added;
        for column in &mut self.columns {
            Arc::make_mut(column).resize(self.row_count, CellValue::Missing);
        }
        for (offset, row) in rows.into_iter().enumerate() {
            for (slug, value) in row {
                if let Some(position) = self.schema.position(&slug) {
                    Arc::make_mut(&mut self.columns[position])[start + offset] = value;
                }
            }
        }
        self.filtered.resize(self.row_count, false);
        debug!(added, rows = self.row_count, "appended rows");
        Ok(())
    }

    /// First-seen `(entityId, entityCode)` per entity name.
    fn identities(&self) -> HashMap<String, Identity> {
        let mut identities = HashMap::new();
        for row in self.iter_rows() {
            if !identities.contains_key(row.entity_name()) {
                identities.insert(
                    row.entity_name().to_string(),
                    (
                        row.value(slugs::ENTITY_ID).clone(),
                        row.value(slugs::ENTITY_CODE).clone(),
                    ),
                );
            }
        }
        identities
    }

    /// Register `spec` and fill its column with `compute(row, index)`.
    ///
    /// Re-adding an existing slug replaces both spec and values. Identity
    /// and time slugs are rejected with [`TableError::ProtectedSlug`].
    pub fn add_column<F>(&mut self, spec: ColumnSpec, mut compute: F) -> Result<&mut Self>
    where
        F: FnMut(RowView<'_>, usize) -> CellValue,
    {
        if is_protected_slug(&spec.slug) {
            return Err(TableError::ProtectedSlug { slug: spec.slug });
        }
        let table: &Table = self;
        let values: Vec<CellValue> = (0..table.row_count)
            .map(|index| compute(RowView { table, index }, index))
            .collect();
        let slug = spec.slug.clone();
        let position = self.schema.insert(spec);
        if position == self.columns.len() {
            self.columns.push(Arc::new(values));
        } else {
            self.columns[position] = Arc::new(values);
        }
        debug!(slug = %slug, "added column");
        Ok(self)
    }

    /// Change display settings of an existing column.
    ///
    /// Returns `false` if `slug` is unknown.
    pub fn update_display(
        &mut self,
        slug: &str,
        update: impl FnOnce(&mut DisplaySettings),
    ) -> bool {
        match self.schema.get_mut(slug) {
            Some(spec) => {
                update(&mut spec.display);
                true
            }
            None => false,
        }
    }

    /// Recompute which rows are hidden from column views.
    ///
    /// A row is hidden when its entity has a population below
    /// `min_population` and is not in `selected`. Entities without a
    /// population entry are never hidden. Each call replaces the previous
    /// filter entirely; without a threshold and with no earlier filter the
    /// call does nothing.
    pub fn apply_filters(
        &mut self,
        selected: &BTreeSet<String>,
        min_population: Option<f64>,
        population: &PopulationMap,
    ) {
        if min_population.is_none() && self.filter.is_none() {
            return;
        }
        let names = self.column_cells(slugs::ENTITY_NAME).cloned();
        let mut hidden = 0usize;
        for (index, flag) in self.filtered.iter_mut().enumerate() {
            let name = names
                .as_ref()
                .and_then(|cells| cells[index].as_text())
                .unwrap_or_default();
            *flag = match (min_population, population.get(name)) {
                (Some(min), Some(size)) => size < min && !selected.contains(name),
                _ => false,
            };
            if *flag {
                hidden += 1;
            }
        }
        self.filter = Some(FilterState {
            selected: selected.clone(),
            min_population,
        });
        debug!(hidden, rows = self.row_count, "applied filters");
    }

    pub fn filter_state(&self) -> Option<&FilterState> {
        self.filter.as_ref()
    }

    pub fn is_filtered(&self, index: usize) -> bool {
        self.filtered.get(index).copied().unwrap_or(false)
    }

    /// View of the defined, unfiltered cells of `slug`.
    pub fn column(&self, slug: &str) -> Option<Column> {
        let position = self.schema.position(slug)?;
        let cells = Arc::clone(&self.columns[position]);
        let rows: Vec<usize> = (0..self.row_count)
            .filter(|&index| cells[index].is_defined() && !self.filtered[index])
            .collect();
        let times = rows
            .iter()
            .map(|&index| self.time_at(index).unwrap_or_default())
            .collect();
        let entity_names = self
            .column_cells(slugs::ENTITY_NAME)
            .map(Arc::clone)
            .unwrap_or_default();
        Some(Column::new(
            self.schema.get(slug)?.clone(),
            self.time_field(),
            cells,
            entity_names,
            rows,
            times,
        ))
    }

    /// First column whose display name is `name`.
    pub fn column_by_name(&self, name: &str) -> Option<Column> {
        let spec = self.schema.iter().find(|spec| spec.display_name() == name)?;
        self.column(&spec.slug)
    }

    pub fn column_by_variable_id(&self, id: i64) -> Option<Column> {
        let spec = self
            .schema
            .iter()
            .find(|spec| spec.owid_variable_id == Some(id))?;
        self.column(&spec.slug)
    }

    /// Views of every column in schema order.
    pub fn columns(&self) -> Vec<Column> {
        self.schema
            .slugs()
            .filter_map(|slug| self.column(slug))
            .collect()
    }

    pub fn column_slugs(&self) -> impl Iterator<Item = &str> {
        self.schema.slugs()
    }

    pub fn has_column(&self, slug: &str) -> bool {
        self.schema.contains(slug)
    }

    pub fn has_day_column(&self) -> bool {
        self.schema.contains(slugs::DAY)
    }

    /// `Day` when any row is day indexed, otherwise `Year`.
    pub fn time_field(&self) -> TimeField {
        if self.has_day_column() {
            TimeField::Day
        } else {
            TimeField::Year
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn spec(&self, slug: &str) -> Option<&ColumnSpec> {
        self.schema.get(slug)
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub(crate) fn column_cells(&self, slug: &str) -> Option<&Arc<Vec<CellValue>>> {
        self.schema
            .position(slug)
            .map(|position| &self.columns[position])
    }

    pub fn cell(&self, index: usize, slug: &str) -> &CellValue {
        self.column_cells(slug)
            .and_then(|cells| cells.get(index))
            .unwrap_or(&MISSING)
    }

    /// Time value of a row, whichever field carries it.
    pub fn time_at(&self, index: usize) -> Option<i64> {
        self.cell(index, slugs::YEAR)
            .as_i64()
            .or_else(|| self.cell(index, slugs::DAY).as_i64())
    }

    pub fn row_view(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.row_count).then_some(RowView { table: self, index })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.row_count).map(move |index| RowView { table: self, index })
    }

    /// Materialize a row with its defined cells in schema order.
    pub fn row(&self, index: usize) -> Option<Row> {
        self.row_view(index).map(|view| view.to_row())
    }

    pub fn rows(&self) -> Vec<Row> {
        self.iter_rows().map(|view| view.to_row()).collect()
    }

    /// Entity names in first-seen order.
    pub fn available_entities(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.iter_rows()
            .map(|row| row.entity_name())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn entity_name_to_id(&self) -> BTreeMap<&str, i64> {
        self.iter_rows()
            .filter_map(|row| Some((row.entity_name(), row.entity_id()?)))
            .collect()
    }

    pub fn entity_name_to_code(&self) -> BTreeMap<&str, &str> {
        self.iter_rows()
            .filter_map(|row| Some((row.entity_name(), row.entity_code()?)))
            .collect()
    }

    pub fn entity_id_to_name(&self) -> BTreeMap<i64, &str> {
        self.iter_rows()
            .filter_map(|row| Some((row.entity_id()?, row.entity_name())))
            .collect()
    }

    /// Distinct values of the table's time field, ascending.
    pub fn all_years(&self) -> Vec<i64> {
        let field = self.time_field();
        let years: BTreeSet<i64> = self
            .iter_rows()
            .filter_map(|row| row.value(field.slug()).as_i64())
            .collect();
        years.into_iter().collect()
    }

    pub fn min_year(&self) -> Option<i64> {
        self.all_years().first().copied()
    }

    pub fn max_year(&self) -> Option<i64> {
        self.all_years().last().copied()
    }

    /// Entity to note, read from the `<slug>-annotations` column.
    pub fn annotations_for(&self, slug: &str) -> BTreeMap<String, String> {
        let Some(notes) = self.column_cells(&annotation_slug(slug)) else {
            return BTreeMap::new();
        };
        self.iter_rows()
            .filter_map(|row| {
                let note = notes[row.index()].as_text()?;
                Some((row.entity_name().to_string(), note.to_string()))
            })
            .collect()
    }
}

fn with_required_slugs(schema: Schema, rows: &[Row]) -> Schema {
    let missing: Vec<&str> = [slugs::ENTITY_NAME, slugs::YEAR, slugs::DAY]
        .into_iter()
        .filter(|slug| !schema.contains(slug))
        .filter(|slug| {
            *slug == slugs::ENTITY_NAME || rows.iter().any(|row| row.value(slug).is_defined())
        })
        .collect();
    if missing.is_empty() {
        return schema;
    }
    missing
        .into_iter()
        .map(ColumnSpec::new)
        .chain(schema.iter().cloned())
        .collect()
}

/// Check identity and time invariants for rows entering a table.
fn validate_rows(
    rows: &[Row],
    offset: usize,
    identities: &mut HashMap<String, Identity>,
) -> Result<()> {
    for (index, row) in rows.iter().enumerate() {
        let position = offset + index;
        let name = match row.entity_name() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(TableError::MissingEntityName { row: position }),
        };
        let has_year = row.value(slugs::YEAR).is_defined();
        let has_day = row.value(slugs::DAY).is_defined();
        match (has_year, has_day) {
            (true, true) => return Err(TableError::TimeFieldConflict { row: position }),
            (false, false) => return Err(TableError::MissingTimeField { row: position }),
            _ => {}
        }

        let id = row.value(slugs::ENTITY_ID);
        let code = row.value(slugs::ENTITY_CODE);
        match identities.get(name) {
            Some((known_id, known_code)) => {
                if known_id != id {
                    return Err(identity_conflict(name, slugs::ENTITY_ID, known_id, id));
                }
                if known_code != code {
                    return Err(identity_conflict(name, slugs::ENTITY_CODE, known_code, code));
                }
            }
            None => {
                identities.insert(name.to_string(), (id.clone(), code.clone()));
            }
        }
    }
    Ok(())
}

fn identity_conflict(
    entity: &str,
    field: &'static str,
    expected: &CellValue,
    found: &CellValue,
) -> TableError {
    TableError::EntityIdentityConflict {
        entity: entity.to_string(),
        field,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Borrowed access to one row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self, slug: &str) -> &'a CellValue {
        self.table.cell(self.index, slug)
    }

    pub fn number(&self, slug: &str) -> Option<f64> {
        self.value(slug).as_number()
    }

    pub fn text(&self, slug: &str) -> Option<&'a str> {
        self.value(slug).as_text()
    }

    pub fn entity_name(&self) -> &'a str {
        self.text(slugs::ENTITY_NAME).unwrap_or_default()
    }

    pub fn entity_id(&self) -> Option<i64> {
        self.value(slugs::ENTITY_ID).as_i64()
    }

    pub fn entity_code(&self) -> Option<&'a str> {
        self.text(slugs::ENTITY_CODE)
    }

    pub fn time(&self) -> Option<i64> {
        self.table.time_at(self.index)
    }

    pub fn time_field(&self) -> Option<TimeField> {
        if self.value(slugs::YEAR).is_defined() {
            Some(TimeField::Year)
        } else if self.value(slugs::DAY).is_defined() {
            Some(TimeField::Day)
        } else {
            None
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.table.is_filtered(self.index)
    }

    pub fn to_row(&self) -> Row {
        self.table
            .schema
            .iter()
            .zip(&self.table.columns)
            .filter(|(_, cells)| cells[self.index].is_defined())
            .map(|(spec, cells)| (spec.slug.clone(), cells[self.index].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(name: &str, id: i64, year: i64, gdp: f64) -> Row {
        Row::new()
            .with("entityName", name)
            .with("entityId", id)
            .with("entityCode", &name[..3])
            .with("year", year)
            .with("gdp", gdp)
    }

    fn sample() -> Table {
        Table::new(vec![
            country("France", 1, 2000, 10.0),
            country("France", 1, 2001, 11.0),
            country("Chad", 2, 2000, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_rows_without_time_or_with_both() {
        let both = Row::new()
            .with("entityName", "A")
            .with("year", 2000)
            .with("day", 3);
        assert_eq!(
            Table::new(vec![both]).unwrap_err(),
            TableError::TimeFieldConflict { row: 0 }
        );
        let neither = Row::new().with("entityName", "A");
        assert_eq!(
            Table::new(vec![neither]).unwrap_err(),
            TableError::MissingTimeField { row: 0 }
        );
        let anonymous = Row::new().with("year", 2000);
        assert_eq!(
            Table::new(vec![anonymous]).unwrap_err(),
            TableError::MissingEntityName { row: 0 }
        );
    }

    #[test]
    fn rejects_inconsistent_identity() {
        let err = Table::new(vec![
            country("France", 1, 2000, 1.0),
            country("France", 2, 2001, 1.0),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TableError::EntityIdentityConflict {
                entity: "France".to_string(),
                field: "entityId",
                expected: "1".to_string(),
                found: "2".to_string(),
            }
        );
    }

    #[test]
    fn explicit_schema_drops_unknown_keys() {
        let schema: Schema = ["entityName", "year"].into_iter().map(ColumnSpec::new).collect();
        let table = Table::with_schema(vec![country("France", 1, 2000, 1.0)], schema).unwrap();
        assert_eq!(table.column_slugs().collect::<Vec<_>>(), vec!["entityName", "year"]);
        assert!(table.column("gdp").is_none());
    }

    #[test]
    fn add_column_rejects_protected_slugs() {
        let mut table = sample();
        for slug in ["entityName", "entityId", "entityCode", "year", "day"] {
            let err = table
                .add_column(ColumnSpec::new(slug), |_, _| CellValue::Missing)
                .unwrap_err();
            assert_eq!(err, TableError::ProtectedSlug { slug: slug.to_string() });
        }
    }

    #[test]
    fn add_column_recomputes_on_reapply() {
        let mut table = sample();
        table
            .add_column(ColumnSpec::new("double"), |row, _| {
                row.number("gdp").map(|v| v * 2.0).into()
            })
            .unwrap();
        let before = table.column("double").unwrap();
        table
            .add_column(ColumnSpec::new("double").with_name("Twice"), |row, _| {
                row.number("gdp").map(|v| v * 2.0 + 1.0).into()
            })
            .unwrap();

        let after = table.column("double").unwrap();
        assert_eq!(after.numbers(), vec![21.0, 23.0, 3.0]);
        assert_eq!(after.name(), "Twice");
        // views keep their own snapshot
        assert_eq!(before.numbers(), vec![20.0, 22.0, 2.0]);
        assert_eq!(table.schema().len(), 6);
    }

    #[test]
    fn column_skips_missing_cells() {
        let mut table = sample();
        table
            .append_rows(vec![
                Row::new()
                    .with("entityName", "Peru")
                    .with("entityId", 3)
                    .with("entityCode", "PER")
                    .with("year", 2001),
            ])
            .unwrap();
        let gdp = table.column("gdp").unwrap();
        assert_eq!(gdp.len(), 3);
        assert_eq!(table.len(), 4);
        assert_eq!(table.available_entities(), vec!["France", "Chad", "Peru"]);
    }

    #[test]
    fn append_rows_checks_identity_against_existing_rows() {
        let mut table = sample();
        let err = table
            .append_rows(vec![country("Chad", 9, 2001, 1.0)])
            .unwrap_err();
        assert!(matches!(err, TableError::EntityIdentityConflict { .. }));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn entity_maps_and_years() {
        let table = sample();
        assert_eq!(table.entity_name_to_id().get("Chad"), Some(&2));
        assert_eq!(table.entity_name_to_code().get("France"), Some(&"Fra"));
        assert_eq!(table.entity_id_to_name().get(&1), Some(&"France"));
        assert_eq!(table.all_years(), vec![2000, 2001]);
        assert_eq!(table.min_year(), Some(2000));
        assert_eq!(table.max_year(), Some(2001));
        assert_eq!(table.time_field(), TimeField::Year);
    }

    #[test]
    fn lookups_by_name_and_variable_id() {
        let mut table = sample();
        table
            .add_column(
                ColumnSpec::new("3-gdp").with_name("GDP").with_variable_id(3),
                |row, _| row.value("gdp").clone(),
            )
            .unwrap();
        assert_eq!(table.column_by_name("GDP").unwrap().slug(), "3-gdp");
        assert_eq!(table.column_by_name("gdp").unwrap().slug(), "gdp");
        assert_eq!(table.column_by_variable_id(3).unwrap().slug(), "3-gdp");
        assert!(table.column_by_variable_id(4).is_none());
    }

    #[test]
    fn update_display_only_touches_display() {
        let mut table = sample();
        assert!(table.update_display("gdp", |display| display.num_decimal_places = Some(2)));
        assert!(!table.update_display("nope", |_| {}));
        assert_eq!(
            table.spec("gdp").unwrap().display.num_decimal_places,
            Some(2)
        );
    }

    #[test]
    fn annotations_read_companion_column() {
        let mut table = sample();
        table
            .add_column(ColumnSpec::new("gdp-annotations"), |row, _| {
                if row.entity_name() == "Chad" {
                    "estimate".into()
                } else {
                    CellValue::Missing
                }
            })
            .unwrap();
        let notes = table.annotations_for("gdp");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes.get("Chad").map(String::as_str), Some("estimate"));
    }

    #[test]
    fn rows_materialize_defined_cells() {
        let table = sample();
        let row = table.row(2).unwrap();
        assert_eq!(row.entity_name(), Some("Chad"));
        assert_eq!(row.number("gdp"), Some(1.0));
        assert!(table.row(3).is_none());
    }
}
