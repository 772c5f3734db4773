//! Population-normalized columns.

use chartdata_model::{CellValue, ColumnSpec, PopulationMap, Table};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::require_source;

/// Add a column holding `value / population * scale` for each row.
///
/// Every row with a numeric source value needs a population entry for its
/// entity; if one is missing the table is left unchanged and
/// [`TransformError::MissingPopulation`] is returned. Rows without a
/// numeric value, or whose result is not finite (zero population), stay
/// undefined.
pub fn add_per_capita_column(
    table: &mut Table,
    spec: ColumnSpec,
    source: &str,
    population: &PopulationMap,
    scale: f64,
) -> Result<()> {
    require_source(table, source)?;
    let mut values = Vec::with_capacity(table.len());
    for row in table.iter_rows() {
        let Some(value) = row.number(source) else {
            values.push(CellValue::Missing);
            continue;
        };
        let entity = row.entity_name();
        let size = population
            .get(entity)
            .ok_or_else(|| TransformError::MissingPopulation {
                entity: entity.to_string(),
            })?;
        let normalized = value / size * scale;
        values.push(if normalized.is_finite() {
            CellValue::Number(normalized)
        } else {
            CellValue::Missing
        });
    }
    debug!(slug = %spec.slug, source, scale, "computed per-capita values");
    table.add_column(spec, |_, index| values[index].clone())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdata_model::Row;

    fn table() -> Table {
        Table::new(vec![
            Row::new().with("entityName", "A").with("year", 2000).with("deaths", 50.0),
            Row::new().with("entityName", "B").with("year", 2000).with("deaths", 3.0),
            Row::new().with("entityName", "C").with("year", 2000),
        ])
        .unwrap()
    }

    #[test]
    fn scales_by_population() {
        let mut table = table();
        let population: PopulationMap = [("A", 2_000_000.0), ("B", 1_000.0)].into_iter().collect();
        add_per_capita_column(&mut table, ColumnSpec::new("perMil"), "deaths", &population, 1e6)
            .unwrap();
        assert_eq!(table.cell(0, "perMil"), &CellValue::Number(25.0));
        assert_eq!(table.cell(1, "perMil"), &CellValue::Number(3000.0));
        // C has no value, so its missing population does not matter
        assert!(table.cell(2, "perMil").is_missing());
    }

    #[test]
    fn missing_population_fails_without_adding_the_column() {
        let mut table = table();
        let population: PopulationMap = [("A", 2_000_000.0)].into_iter().collect();
        let err = add_per_capita_column(
            &mut table,
            ColumnSpec::new("perMil"),
            "deaths",
            &population,
            1e6,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingPopulation {
                entity: "B".to_string()
            }
        );
        assert!(!table.has_column("perMil"));
    }

    #[test]
    fn zero_population_leaves_value_undefined() {
        let mut table = table();
        let population: PopulationMap = [("A", 0.0), ("B", 1.0)].into_iter().collect();
        add_per_capita_column(&mut table, ColumnSpec::new("pc"), "deaths", &population, 1.0)
            .unwrap();
        assert!(table.cell(0, "pc").is_missing());
    }
}
