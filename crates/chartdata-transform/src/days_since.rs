//! Elapsed time since an entity first reached a threshold.

use std::collections::HashMap;

use chartdata_model::{CellValue, ColumnSpec, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::require_source;

/// Which rows after day zero get a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaysSincePolicy {
    /// Every row at or after day zero.
    #[default]
    KeepAfterStart,
    /// Only rows whose own value is at or above the threshold.
    ExcludeBelowThreshold,
}

/// Add a column holding `time - day_zero` per entity.
///
/// Day zero is the time of the entity's first row, in time order, whose
/// source value is at least `threshold`. Rows before it stay undefined,
/// as do all rows of entities that never reach the threshold.
pub fn add_days_since_column(
    table: &mut Table,
    spec: ColumnSpec,
    source: &str,
    threshold: f64,
    policy: DaysSincePolicy,
) -> Result<()> {
    require_source(table, source)?;
    let values = days_since(table, source, threshold, policy);
    debug!(slug = %spec.slug, source, threshold, ?policy, "computed days since threshold");
    table.add_column(spec, |_, index| values[index].clone())?;
    Ok(())
}

fn days_since(
    table: &Table,
    source: &str,
    threshold: f64,
    policy: DaysSincePolicy,
) -> Vec<CellValue> {
    let mut by_entity: HashMap<&str, Vec<(i64, usize)>> = HashMap::new();
    for row in table.iter_rows() {
        if let Some(time) = row.time() {
            by_entity
                .entry(row.entity_name())
                .or_default()
                .push((time, row.index()));
        }
    }

    let mut values = vec![CellValue::Missing; table.len()];
    for rows in by_entity.values_mut() {
        rows.sort_by_key(|&(time, _)| time);
        let reached = |index: usize| {
            table
                .cell(index, source)
                .as_number()
                .is_some_and(|value| value >= threshold)
        };
        let Some(&(day_zero, _)) = rows.iter().find(|&&(_, index)| reached(index)) else {
            continue;
        };
        for &(time, index) in rows.iter().filter(|&&(time, _)| time >= day_zero) {
            if policy == DaysSincePolicy::ExcludeBelowThreshold && !reached(index) {
                continue;
            }
            values[index] = CellValue::Number((time - day_zero) as f64);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdata_model::Row;

    fn cases_table() -> Table {
        let rows = [50.0, 100.0, 150.0, 90.0, 200.0]
            .iter()
            .enumerate()
            .map(|(day, &cases)| {
                Row::new()
                    .with("entityName", "A")
                    .with("day", 10 + 2 * day as i64)
                    .with("cases", cases)
            })
            .collect();
        Table::new(rows).unwrap()
    }

    fn column(table: &Table) -> Vec<CellValue> {
        (0..table.len()).map(|i| table.cell(i, "since").clone()).collect()
    }

    #[test]
    fn keeps_rows_after_start_by_default() {
        let mut table = cases_table();
        add_days_since_column(
            &mut table,
            ColumnSpec::new("since"),
            "cases",
            100.0,
            DaysSincePolicy::default(),
        )
        .unwrap();
        assert_eq!(
            column(&table),
            vec![
                CellValue::Missing,
                CellValue::Number(0.0),
                CellValue::Number(2.0),
                CellValue::Number(4.0),
                CellValue::Number(6.0),
            ]
        );
    }

    #[test]
    fn can_exclude_later_dips() {
        let mut table = cases_table();
        add_days_since_column(
            &mut table,
            ColumnSpec::new("since"),
            "cases",
            100.0,
            DaysSincePolicy::ExcludeBelowThreshold,
        )
        .unwrap();
        assert_eq!(
            column(&table),
            vec![
                CellValue::Missing,
                CellValue::Number(0.0),
                CellValue::Number(2.0),
                CellValue::Missing,
                CellValue::Number(6.0),
            ]
        );
    }

    #[test]
    fn entity_below_threshold_gets_nothing() {
        let mut table = cases_table();
        add_days_since_column(
            &mut table,
            ColumnSpec::new("since"),
            "cases",
            1e9,
            DaysSincePolicy::default(),
        )
        .unwrap();
        assert!(column(&table).iter().all(CellValue::is_missing));
    }
}
