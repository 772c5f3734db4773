//! Trailing rolling averages per entity.

use chartdata_model::{CellValue, ColumnSpec, Table, slugs};
use tracing::debug;

use crate::error::Result;
use crate::require_source;

/// Add a column holding the trailing `window`-step average of `source`.
///
/// Rows must already be sorted by entity, then by time; this is not
/// checked. Each contiguous run of rows for one entity is averaged on its
/// own. The window spans `window` time steps ending at the current row,
/// so gaps in the time axis count towards the window but contribute no
/// value. The mean is taken over the defined values inside the window. A
/// row whose own source value is undefined stays undefined.
pub fn add_rolling_average_column(
    table: &mut Table,
    spec: ColumnSpec,
    source: &str,
    window: u32,
) -> Result<()> {
    require_source(table, source)?;
    let averages = rolling_averages(table, source, window);
    let defined = averages.iter().filter(|value| value.is_defined()).count();
    debug!(slug = %spec.slug, source, window, defined, "computed rolling average");
    table.add_column(spec, |_, index| averages[index].clone())?;
    Ok(())
}

fn rolling_averages(table: &Table, source: &str, window: u32) -> Vec<CellValue> {
    let mut averages = vec![CellValue::Missing; table.len()];
    let window = i64::from(window.max(1));

    let mut run_start = 0;
    while run_start < table.len() {
        let entity = table.cell(run_start, slugs::ENTITY_NAME);
        let mut run_end = run_start + 1;
        while run_end < table.len() && table.cell(run_end, slugs::ENTITY_NAME) == entity {
            run_end += 1;
        }
        average_run(table, source, window, run_start..run_end, &mut averages);
        run_start = run_end;
    }
    averages
}

/// Trailing window over one entity's rows, keyed on time.
fn average_run(
    table: &Table,
    source: &str,
    window: i64,
    rows: std::ops::Range<usize>,
    averages: &mut [CellValue],
) {
    let mut tail = rows.start;
    for index in rows {
        if table.cell(index, source).as_number().is_none() {
            continue;
        }
        let time = table.time_at(index).unwrap_or_default();
        while tail < index && table.time_at(tail).unwrap_or_default() <= time - window {
            tail += 1;
        }
        let (sum, count) = (tail..=index)
            .filter_map(|row| table.cell(row, source).as_number())
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
        averages[index] = CellValue::Number(sum / count as f64);
    }
}
