//! Integration tests for table views, filters and export.

use std::collections::BTreeSet;

use chartdata_model::{CellValue, ColumnSpec, PopulationMap, Row, Table};

fn observation(name: &str, id: i64, code: &str, year: i64, gdp: Option<f64>) -> Row {
    Row::new()
        .with("entityName", name)
        .with("entityId", id)
        .with("entityCode", code)
        .with("year", year)
        .with("gdp", gdp)
}

fn sample_table() -> Table {
    Table::new(vec![
        observation("France", 1, "FRA", 2000, Some(10.5)),
        observation("France", 1, "FRA", 2001, None),
        observation("Tuvalu", 2, "TUV", 2000, Some(0.1)),
        observation("Chad", 3, "TCD", 2001, Some(2.0)),
        observation("Atlantis", 4, "ATL", 2001, Some(7.0)),
    ])
    .expect("build table")
}

fn population() -> PopulationMap {
    [
        ("France", 67_000_000.0),
        ("Tuvalu", 11_792.0),
        ("Chad", 16_000_000.0),
    ]
    .into_iter()
    .collect()
}

fn selected(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn column_arrays_stay_parallel() {
    let table = sample_table();
    let gdp = table.column("gdp").expect("gdp column");
    let values: Vec<&CellValue> = gdp.values().collect();
    let names: Vec<&str> = gdp.entity_names().collect();

    assert_eq!(values.len(), 4);
    assert_eq!(gdp.times().len(), values.len());
    assert_eq!(names.len(), values.len());
    assert_eq!(names, vec!["France", "Tuvalu", "Chad", "Atlantis"]);
    assert_eq!(gdp.times(), &[2000, 2000, 2001, 2001]);
    assert_eq!(gdp.entities_uniq(), vec!["France", "Tuvalu", "Chad", "Atlantis"]);
}

#[test]
fn schema_includes_keys_missing_from_some_rows() {
    let table = Table::new(vec![
        Row::new().with("entityName", "A").with("year", 2000),
        Row::new()
            .with("entityName", "B")
            .with("year", 2000)
            .with("extra", 1.0),
    ])
    .expect("build table");
    assert!(table.has_column("extra"));
    assert_eq!(table.column("extra").expect("extra").len(), 1);
}

#[test]
fn filters_keep_selected_and_unknown_entities() {
    let mut table = sample_table();
    table.apply_filters(&selected(&["Tuvalu"]), Some(20_000_000.0), &population());

    let gdp = table.column("gdp").expect("gdp column");
    let names: Vec<&str> = gdp.entity_names().collect();
    // Chad is below the threshold and not selected; Atlantis has no population
    assert_eq!(names, vec!["France", "Tuvalu", "Atlantis"]);
    assert!(table.is_filtered(3));
    let state = table.filter_state().expect("filter state");
    assert_eq!(state.min_population, Some(20_000_000.0));
}

#[test]
fn filters_are_recomputed_from_scratch() {
    let mut table = sample_table();
    table.apply_filters(&BTreeSet::new(), Some(20_000_000.0), &population());
    assert_eq!(table.column("gdp").expect("gdp").len(), 2);

    // dropping the threshold clears every flag set by the previous call
    table.apply_filters(&BTreeSet::new(), None, &population());
    assert_eq!(table.column("gdp").expect("gdp").len(), 4);
    assert!((0..table.len()).all(|index| !table.is_filtered(index)));
}

#[test]
fn filter_without_threshold_is_a_no_op_initially() {
    let mut table = sample_table();
    table.apply_filters(&selected(&["France"]), None, &population());
    assert!(table.filter_state().is_none());
}

#[test]
fn entity_map_keeps_last_value() {
    let table = Table::new(vec![
        observation("France", 1, "FRA", 2000, Some(1.0)),
        observation("France", 1, "FRA", 2001, Some(2.0)),
    ])
    .expect("build table");
    let gdp = table.column("gdp").expect("gdp");
    assert_eq!(
        gdp.entity_map().get("France").copied(),
        Some(&CellValue::Number(2.0))
    );
}

#[test]
fn delimited_export_follows_schema_order() {
    let mut table = sample_table();
    table
        .add_column(ColumnSpec::new("label"), |row, _| {
            CellValue::from(format!("{}:{}", row.entity_name(), row.time().unwrap_or_default()))
        })
        .expect("add label");

    insta::assert_snapshot!(table.to_delimited(",", None), @r"
    entityName,entityId,entityCode,year,gdp,label
    France,1,FRA,2000,10.5,France:2000
    France,1,FRA,2001,,France:2001
    Tuvalu,2,TUV,2000,0.1,Tuvalu:2000
    Chad,3,TCD,2001,2,Chad:2001
    Atlantis,4,ATL,2001,7,Atlantis:2001
    ");
}

#[test]
fn delimited_export_respects_row_limit() {
    let table = sample_table();
    assert_eq!(
        table.to_delimited("\t", Some(1)),
        "entityName\tentityId\tentityCode\tyear\tgdp\nFrance\t1\tFRA\t2000\t10.5"
    );
    // zero is no cap, not an empty body
    assert_eq!(table.to_delimited(",", Some(0)), table.to_delimited(",", None));
    assert_eq!(table.to_delimited(",", Some(0)).lines().count(), 6);
    assert_eq!(table.to_delimited(",", Some(99)).lines().count(), 6);
}

#[test]
fn visible_export_skips_filtered_rows() {
    let mut table = sample_table();
    table.apply_filters(&BTreeSet::new(), Some(20_000_000.0), &population());

    insta::assert_snapshot!(table.to_delimited_visible(",", None), @r"
    entityName,entityId,entityCode,year,gdp
    France,1,FRA,2000,10.5
    France,1,FRA,2001,
    Atlantis,4,ATL,2001,7
    ");
    assert_eq!(table.to_delimited_visible(",", Some(1)).lines().count(), 2);
    // the unfiltered export still lists every row
    assert_eq!(table.to_delimited(",", None).lines().count(), 6);

    let snapshot = table.visible_snapshot();
    let names: Vec<&str> = snapshot.rows.iter().filter_map(Row::entity_name).collect();
    assert_eq!(names, vec!["France", "France", "Atlantis"]);
    assert_eq!(table.snapshot().rows.len(), 5);
}

#[test]
fn explicit_schema_keeps_name_and_time_slugs() {
    let rows = vec![
        Row::new()
            .with("entityName", "France")
            .with("year", 2000)
            .with("gdp", 1.5),
    ];
    let table = Table::with_schema(rows, ["gdp"].into_iter().map(ColumnSpec::new).collect())
        .expect("build table");

    let slugs: Vec<&str> = table.column_slugs().collect();
    assert_eq!(slugs, vec!["entityName", "year", "gdp"]);
    let gdp = table.column("gdp").expect("gdp column");
    assert_eq!(gdp.entity_names().collect::<Vec<_>>(), vec!["France"]);
    assert_eq!(gdp.times(), &[2000]);
}

#[test]
fn explicit_schema_without_entity_name_gains_one() {
    let rows = vec![
        observation("France", 1, "FRA", 2000, Some(10.5)),
        observation("Chad", 3, "TCD", 2001, Some(2.0)),
    ];
    let schema = ["year", "gdp"].into_iter().map(ColumnSpec::new).collect();
    let table = Table::with_schema(rows, schema).expect("build table");

    let slugs: Vec<&str> = table.column_slugs().collect();
    assert_eq!(slugs, vec!["entityName", "year", "gdp"]);
    let gdp = table.column("gdp").expect("gdp column");
    assert_eq!(gdp.entity_names().collect::<Vec<_>>(), vec!["France", "Chad"]);
}

#[test]
fn snapshot_serializes_rows_without_missing_cells() {
    let table = sample_table();
    let json = serde_json::to_value(table.snapshot()).expect("serialize");
    assert_eq!(json["columns"].as_array().map(Vec::len), Some(5));
    assert_eq!(
        json["rows"][1],
        serde_json::json!({
            "entityName": "France",
            "entityId": 1,
            "entityCode": "FRA",
            "year": 2001
        })
    );
}
