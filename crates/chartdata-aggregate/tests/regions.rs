use chartdata_aggregate::{
    AggregateError, AggregationPolicy, AggregatorOptions, BlocDefinition, GroupKind,
    append_region_rows, reduce_group,
};
use chartdata_model::{CellValue, EntityRegistry, Row, Table};
use proptest::prelude::*;

fn country(
    name: &str,
    id: i64,
    continent: &str,
    day: i64,
    population: f64,
    new_cases: Option<f64>,
) -> Row {
    Row::new()
        .with("entityName", name)
        .with("entityId", id)
        .with("entityCode", &name[..3])
        .with("day", day)
        .with("continent", continent)
        .with("population", population)
        .with("new_cases", new_cases)
        .with("new_deaths", 0.0)
}

fn sample_table() -> Table {
    Table::new(vec![
        country("France", 0, "Europe", 1, 65.0, Some(10.0)),
        country("France", 0, "Europe", 2, 65.0, Some(5.0)),
        country("France", 0, "Europe", 3, 65.0, None),
        country("Germany", 1, "Europe", 2, 83.0, Some(7.0)),
        country("Germany", 1, "Europe", 3, 83.0, Some(1.0)),
        country("Canada", 2, "North America", 1, 38.0, Some(4.0)),
        country("Mexico", 3, "North America", 3, 126.0, Some(2.0)),
    ])
    .expect("build table")
}

fn continents_only() -> AggregatorOptions {
    AggregatorOptions::default().with_blocs(Vec::new())
}

fn synthetic_rows<'a>(rows: &'a [Row], name: &str) -> Vec<&'a Row> {
    rows.iter()
        .filter(|row| row.entity_name() == Some(name))
        .collect()
}

#[test]
fn continent_rows_sum_constituents_per_day() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    let summary =
        append_region_rows(&mut table, &mut registry, &continents_only()).expect("aggregate");

    assert_eq!(summary.groups.len(), 2);
    assert_eq!(summary.groups[0].label, "Europe");
    assert_eq!(summary.groups[1].label, "North America");
    assert_eq!(table.len(), 7 + summary.rows());

    let rows = table.rows();
    let europe = synthetic_rows(&rows, "Europe");
    let new_cases: Vec<f64> = europe
        .iter()
        .map(|row| row.number("new_cases").expect("new_cases"))
        .collect();
    assert_eq!(new_cases, vec![10.0, 12.0, 1.0]);
    let totals: Vec<f64> = europe
        .iter()
        .map(|row| row.number("total_cases").expect("total_cases"))
        .collect();
    assert_eq!(totals, vec![10.0, 22.0, 23.0]);
    assert!(europe.iter().all(|row| !row.contains("continent")));
}

#[test]
fn synthetic_identity_follows_real_entities() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    let summary =
        append_region_rows(&mut table, &mut registry, &continents_only()).expect("aggregate");

    let north_america = summary.get("North America").expect("group");
    assert_eq!(north_america.entity_code, "NorthAmerica");
    assert_eq!(north_america.kind, GroupKind::Continent);
    assert_eq!(summary.get("Europe").map(|group| group.entity_id), Some(4));
    assert_eq!(north_america.entity_id, 5);
    assert!(registry.is_sealed());
    assert_eq!(
        table.entity_name_to_code().get("North America"),
        Some(&"NorthAmerica")
    );
}

#[test]
fn population_holds_its_running_maximum() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    append_region_rows(&mut table, &mut registry, &continents_only()).expect("aggregate");

    let rows = table.rows();
    let population: Vec<f64> = synthetic_rows(&rows, "North America")
        .iter()
        .map(|row| row.number("population").expect("population"))
        .collect();
    // Canada reports on day 1 only, Mexico on day 3 only.
    assert_eq!(population, vec![38.0, 126.0]);

    let options = continents_only()
        .with_continent_policy(AggregationPolicy::continent().with_sticky_population(false));
    let table = sample_table();
    let europe: Vec<usize> = (0..5).collect();
    let buckets = reduce_group(
        &table,
        &europe,
        &options.measures,
        options.continent_policy,
    )
    .expect("reduce");
    let raw: Vec<f64> = buckets.iter().map(|bucket| bucket.population).collect();
    assert_eq!(raw, vec![65.0, 148.0, 148.0]);
}

#[test]
fn sticky_population_never_drops() {
    let table = Table::new(vec![
        country("Chile", 0, "South America", 1, 19.0, Some(1.0)),
        country("Peru", 1, "South America", 1, 33.0, Some(1.0)),
        country("Chile", 0, "South America", 2, 19.0, Some(1.0)),
    ])
    .expect("build table");
    let buckets = reduce_group(
        &table,
        &[0, 1, 2],
        &AggregatorOptions::default().measures,
        AggregationPolicy::continent(),
    )
    .expect("reduce");
    assert_eq!(buckets[0].population, 52.0);
    assert_eq!(buckets[1].population, 52.0);
}

#[test]
fn bloc_drops_its_latest_bucket() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    let options = AggregatorOptions::default().with_continents(false);
    let summary = append_region_rows(&mut table, &mut registry, &options).expect("aggregate");

    let eu = summary.get("European Union").expect("bloc");
    assert_eq!(eu.kind, GroupKind::Bloc);
    assert_eq!(eu.entity_code, "EuropeanUnion");
    assert_eq!(eu.constituents, 5);
    assert_eq!(eu.buckets, 2);
    assert_eq!(eu.dropped, 1);

    let rows = table.rows();
    let days: Vec<f64> = synthetic_rows(&rows, "European Union")
        .iter()
        .map(|row| row.number("day").expect("day"))
        .collect();
    assert_eq!(days, vec![1.0, 2.0]);
}

#[test]
fn drop_policy_is_overridable() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    let bloc = BlocDefinition::new("Neighbours", ["France", "Germany"])
        .with_policy(AggregationPolicy::bloc().with_drop_latest_buckets(0));
    let options = AggregatorOptions::default()
        .with_continents(false)
        .with_blocs(vec![bloc]);
    let summary = append_region_rows(&mut table, &mut registry, &options).expect("aggregate");
    assert_eq!(summary.get("Neighbours").map(|group| group.buckets), Some(3));
}

#[test]
fn blocs_without_members_are_skipped() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    let options = AggregatorOptions::default()
        .with_continents(false)
        .with_blocs(vec![BlocDefinition::new("Nordics", ["Norway", "Iceland"])]);
    let summary = append_region_rows(&mut table, &mut registry, &options).expect("aggregate");
    assert!(summary.is_empty());
    assert!(!registry.is_sealed());
    assert_eq!(table.len(), 7);
}

#[test]
fn label_naming_a_real_entity_is_rejected() {
    let mut table = Table::new(vec![
        country("Europe", 0, "Europe", 1, 1.0, Some(1.0)),
        country("France", 1, "Europe", 1, 65.0, Some(1.0)),
    ])
    .expect("build table");
    let mut registry = EntityRegistry::from_table(&table);
    let err = append_region_rows(&mut table, &mut registry, &continents_only())
        .expect_err("collision");
    assert_eq!(
        err,
        AggregateError::NameCollision {
            label: "Europe".to_string()
        }
    );
    assert_eq!(table.len(), 2);
    assert!(!registry.is_sealed());
}

#[test]
fn rows_without_the_table_time_field_are_rejected() {
    let mut table = sample_table();
    table
        .append_rows(vec![
            Row::new()
                .with("entityName", "Spain")
                .with("entityId", 9)
                .with("entityCode", "ESP")
                .with("year", 2020)
                .with("continent", "Europe"),
        ])
        .expect("append");
    let mut registry = EntityRegistry::from_table(&table);
    let err = append_region_rows(&mut table, &mut registry, &continents_only())
        .expect_err("mixed time fields");
    assert!(matches!(
        err,
        AggregateError::MissingTimeField { ref entity, field: "day", .. } if entity == "Spain"
    ));
}

#[test]
fn missing_measures_count_as_zero() {
    let mut table = sample_table();
    let mut registry = EntityRegistry::from_table(&table);
    append_region_rows(&mut table, &mut registry, &continents_only()).expect("aggregate");
    let rows = table.rows();
    let europe = synthetic_rows(&rows, "Europe");
    // France has no new_cases on day 3; Germany's 1.0 stands alone.
    assert_eq!(europe[2].value("new_cases"), &CellValue::Number(1.0));
}

proptest! {
    #[test]
    fn continent_sum_and_totals_hold(
        cases in prop::collection::vec((0i64..6, 0i64..20, 0u32..500), 1..60)
    ) {
        let names = ["Chile", "Peru", "Brazil", "Uruguay", "Bolivia", "Ecuador"];
        let mut seen = std::collections::HashSet::new();
        let rows: Vec<Row> = cases
            .iter()
            .filter(|(entity, day, _)| seen.insert((*entity, *day)))
            .map(|&(entity, day, value)| {
                country(
                    names[entity as usize],
                    entity,
                    "South America",
                    day,
                    10.0,
                    Some(f64::from(value)),
                )
            })
            .collect();
        let mut table = Table::new(rows.clone()).expect("build table");
        let mut registry = EntityRegistry::from_table(&table);
        append_region_rows(&mut table, &mut registry, &continents_only()).expect("aggregate");

        let all = table.rows();
        let aggregate = synthetic_rows(&all, "South America");
        let mut previous_total = 0.0;
        for row in aggregate {
            let day = row.number("day").expect("day");
            let expected: f64 = rows
                .iter()
                .filter(|source| source.number("day") == Some(day))
                .filter_map(|source| source.number("new_cases"))
                .sum();
            prop_assert_eq!(row.number("new_cases"), Some(expected));
            let total = row.number("total_cases").expect("total_cases");
            prop_assert!(total >= previous_total);
            previous_total = total;
        }
    }
}
