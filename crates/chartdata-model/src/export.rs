//! Plain-text and serde exports of a table.

use serde::Serialize;

use crate::row::Row;
use crate::spec::ColumnSpec;
use crate::table::Table;

/// Schema and rows, ready for a downstream serializer.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Render as delimiter-separated text.
    ///
    /// The header lists every slug in schema order. Missing cells render
    /// as empty fields. Values are written as-is, without quoting, and
    /// filtered rows are included. `row_limit` caps the number of data
    /// rows; `None` and `Some(0)` both mean no cap.
    pub fn to_delimited(&self, delimiter: &str, row_limit: Option<usize>) -> String {
        self.render_delimited(0..self.len(), delimiter, row_limit)
    }

    /// Like [`Table::to_delimited`], skipping rows hidden by the current
    /// filter. The row limit counts visible rows only.
    pub fn to_delimited_visible(&self, delimiter: &str, row_limit: Option<usize>) -> String {
        self.render_delimited(self.visible_indices(), delimiter, row_limit)
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            columns: self.schema().iter().cloned().collect(),
            rows: self.rows(),
        }
    }

    /// Snapshot holding only rows not hidden by the current filter.
    pub fn visible_snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            columns: self.schema().iter().cloned().collect(),
            rows: self
                .visible_indices()
                .filter_map(|index| self.row(index))
                .collect(),
        }
    }

    fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&index| !self.is_filtered(index))
    }

    fn render_delimited(
        &self,
        indices: impl Iterator<Item = usize>,
        delimiter: &str,
        row_limit: Option<usize>,
    ) -> String {
        let slugs: Vec<&str> = self.column_slugs().collect();
        let limit = row_limit.filter(|&limit| limit > 0).unwrap_or(usize::MAX);

        let mut lines = vec![slugs.join(delimiter)];
        for index in indices.take(limit) {
            let line = slugs
                .iter()
                .map(|slug| self.cell(index, slug).to_string())
                .collect::<Vec<_>>()
                .join(delimiter);
            lines.push(line);
        }
        lines.join("\n")
    }
}
