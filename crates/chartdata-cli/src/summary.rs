use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use chartdata_aggregate::{GroupKind, GroupSummary};

use crate::types::RunResult;

/// Print the run summary to stderr so stdout stays reserved for the table.
pub fn print_summary(result: &RunResult) {
    eprintln!("Input: {}", result.input.display());
    if let Some(path) = &result.output {
        eprintln!("Output: {}", path.display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Entities"),
        header_cell("Synthetic"),
        header_cell("Hidden rows"),
        header_cell("Derived columns"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 0..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let derived = if result.derived.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(result.derived.join("\n"))
    };
    table.add_row(vec![
        Cell::new(result.rows).add_attribute(Attribute::Bold),
        Cell::new(result.columns),
        Cell::new(result.entities),
        count_cell(result.synthetic_entities, Color::Blue),
        count_cell(result.hidden_rows, Color::Yellow),
        derived,
    ]);
    eprintln!("{table}");

    print_region_table(&result.regions.groups);

    if !result.skipped.is_empty() {
        eprintln!("Skipped variables:");
        for message in &result.skipped {
            eprintln!("- {message}");
        }
    }
}

fn print_region_table(groups: &[GroupSummary]) {
    if groups.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Group"),
        header_cell("Kind"),
        header_cell("Id"),
        header_cell("Code"),
        header_cell("Constituent rows"),
        header_cell("Rows"),
        header_cell("Dropped"),
    ]);
    apply_summary_table_style(&mut table);
    for index in [2, 4, 5, 6] {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.label)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            kind_cell(group.kind),
            Cell::new(group.entity_id),
            Cell::new(&group.entity_code),
            Cell::new(group.constituents),
            Cell::new(group.buckets),
            count_cell(group.dropped, Color::Yellow),
        ]);
    }
    let total: usize = groups.iter().map(|group| group.buckets).sum();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(total).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    eprintln!();
    eprintln!("Regions:");
    eprintln!("{table}");
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn kind_cell(kind: GroupKind) -> Cell {
    match kind {
        GroupKind::Continent => Cell::new("continent"),
        GroupKind::Bloc => Cell::new("bloc").fg(Color::Magenta),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
