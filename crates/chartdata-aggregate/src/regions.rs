//! Synthetic region rows built from constituent entity rows.

use std::collections::{BTreeMap, HashMap};

use chartdata_model::{EntityRegistry, Row, Table, slugs};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AggregateError, Result};
use crate::options::{AggregateMeasures, AggregationPolicy, AggregatorOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Continent,
    Bloc,
}

/// Sums for one time value across a group's constituents.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub time: i64,
    /// Summed population, or the running maximum under a sticky policy.
    pub population: f64,
    /// One sum per [`AggregateMeasures::summed`] entry.
    pub daily: Vec<f64>,
    /// Running totals of `daily`, in the same order.
    pub totals: Vec<f64>,
}

impl Bucket {
    fn empty(time: i64, measures: usize) -> Self {
        Self {
            time,
            population: 0.0,
            daily: vec![0.0; measures],
            totals: vec![0.0; measures],
        }
    }
}

/// What one group contributed to the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub kind: GroupKind,
    pub entity_id: i64,
    pub entity_code: String,
    /// Constituent rows read.
    pub constituents: usize,
    /// Synthetic rows appended.
    pub buckets: usize,
    /// Latest buckets discarded by the group's policy.
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationSummary {
    pub groups: Vec<GroupSummary>,
}

impl AggregationSummary {
    pub fn get(&self, label: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|group| group.label == label)
    }

    /// Total synthetic rows appended.
    pub fn rows(&self) -> usize {
        self.groups.iter().map(|group| group.buckets).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

struct Group {
    label: String,
    kind: GroupKind,
    policy: AggregationPolicy,
    rows: Vec<usize>,
}

/// Entity code for a group label: the label with spaces removed.
pub fn region_code(label: &str) -> String {
    label.replace(' ', "")
}

/// Bucket `rows` by time and compute sums, running totals and population.
///
/// Missing measure cells count as 0. Buckets come back in ascending time
/// order with the policy's latest buckets already removed.
pub fn reduce_group(
    table: &Table,
    rows: &[usize],
    measures: &AggregateMeasures,
    policy: AggregationPolicy,
) -> Result<Vec<Bucket>> {
    reduce(table, rows, measures, policy).map(|(buckets, _)| buckets)
}

/// Kept buckets and the number dropped by the policy.
fn reduce(
    table: &Table,
    rows: &[usize],
    measures: &AggregateMeasures,
    policy: AggregationPolicy,
) -> Result<(Vec<Bucket>, usize)> {
    let time_slug = table.time_field().slug();
    let mut by_time: HashMap<i64, Bucket> = HashMap::new();
    for &index in rows {
        let time = table.cell(index, time_slug).as_i64().ok_or_else(|| {
            AggregateError::MissingTimeField {
                row: index,
                entity: table
                    .cell(index, slugs::ENTITY_NAME)
                    .as_text()
                    .unwrap_or_default()
                    .to_string(),
                field: time_slug,
            }
        })?;
        let bucket = by_time
            .entry(time)
            .or_insert_with(|| Bucket::empty(time, measures.summed.len()));
        bucket.population += number_or_zero(table, index, &measures.population);
        for (sum, measure) in bucket.daily.iter_mut().zip(&measures.summed) {
            *sum += number_or_zero(table, index, &measure.daily);
        }
    }

    let mut buckets: Vec<Bucket> = by_time.into_values().collect();
    buckets.sort_by_key(|bucket| bucket.time);

    let mut running = vec![0.0; measures.summed.len()];
    let mut max_population = 0.0_f64;
    for bucket in &mut buckets {
        for (total, daily) in running.iter_mut().zip(&bucket.daily) {
            *total += daily;
        }
        bucket.totals.clone_from(&running);
        if policy.sticky_population {
            max_population = max_population.max(bucket.population);
            bucket.population = max_population;
        }
    }

    let keep = buckets.len().saturating_sub(policy.drop_latest_buckets);
    let dropped = buckets.len() - keep;
    buckets.truncate(keep);
    Ok((buckets, dropped))
}

fn number_or_zero(table: &Table, index: usize, slug: &str) -> f64 {
    table.cell(index, slug).as_number().unwrap_or(0.0)
}

/// Append one synthetic row series per continent and bloc.
///
/// Continents come first in label order, then blocs in declaration order;
/// synthetic ids are allocated in that order once every real entity of
/// `table` is known to `registry`. Rows carry the group label as name, the
/// label without spaces as code, the table's time field and the configured
/// measures that exist in the table. No row is appended if any label
/// already names an entity.
pub fn append_region_rows(
    table: &mut Table,
    registry: &mut EntityRegistry,
    options: &AggregatorOptions,
) -> Result<AggregationSummary> {
    register_real_entities(table, registry)?;

    let groups = collect_groups(table, options);
    if let Some(group) = groups.iter().find(|group| registry.contains(&group.label)) {
        return Err(AggregateError::NameCollision {
            label: group.label.clone(),
        });
    }

    let time_slug = table.time_field().slug();
    let measures = &options.measures;
    let write_population = table.has_column(&measures.population);
    let written: Vec<bool> = measures
        .summed
        .iter()
        .map(|measure| table.has_column(&measure.daily))
        .collect();

    let mut reduced = Vec::with_capacity(groups.len());
    for group in &groups {
        reduced.push(reduce(table, &group.rows, measures, group.policy)?);
    }

    let mut summary = AggregationSummary::default();
    let mut rows = Vec::new();
    for (group, (buckets, dropped)) in groups.iter().zip(reduced) {
        let code = region_code(&group.label);
        let id = registry.allocate_synthetic(&group.label, &code)?;
        debug!(
            label = %group.label,
            id,
            constituents = group.rows.len(),
            buckets = buckets.len(),
            dropped,
            "reduced region group"
        );
        summary.groups.push(GroupSummary {
            label: group.label.clone(),
            kind: group.kind,
            entity_id: id,
            entity_code: code.clone(),
            constituents: group.rows.len(),
            buckets: buckets.len(),
            dropped,
        });
        for bucket in buckets {
            let mut row = Row::new()
                .with(slugs::ENTITY_NAME, group.label.as_str())
                .with(slugs::ENTITY_ID, id)
                .with(slugs::ENTITY_CODE, code.as_str())
                .with(time_slug, bucket.time);
            if write_population {
                row.set(measures.population.as_str(), bucket.population);
            }
            for (position, measure) in measures.summed.iter().enumerate() {
                if !written[position] {
                    continue;
                }
                row.set(measure.daily.as_str(), bucket.daily[position]);
                if let Some(total) = &measure.total {
                    row.set(total.as_str(), bucket.totals[position]);
                }
            }
            rows.push(row);
        }
    }

    table.append_rows(rows)?;
    info!(
        groups = summary.groups.len(),
        rows = summary.rows(),
        "appended region rows"
    );
    Ok(summary)
}

/// Make sure every entity in `table` has its id before synthetic ids are
/// handed out.
fn register_real_entities(table: &Table, registry: &mut EntityRegistry) -> Result<()> {
    for row in table.iter_rows() {
        let name = row.entity_name();
        if registry.contains(name) {
            continue;
        }
        let code = row.entity_code().unwrap_or_default();
        match row.entity_id() {
            Some(id) => registry.register_with_id(id, name, code)?,
            None => registry.register(name, code)?,
        };
    }
    Ok(())
}

fn collect_groups(table: &Table, options: &AggregatorOptions) -> Vec<Group> {
    let mut groups = Vec::new();

    if options.continents {
        let mut continents: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for row in table.iter_rows() {
            if let Some(label) = row
                .text(&options.continent_key)
                .map(str::trim)
                .filter(|label| !label.is_empty())
            {
                continents.entry(label).or_default().push(row.index());
            }
        }
        groups.extend(continents.into_iter().map(|(label, rows)| Group {
            label: label.to_string(),
            kind: GroupKind::Continent,
            policy: options.continent_policy,
            rows,
        }));
    }

    for bloc in &options.blocs {
        let rows: Vec<usize> = table
            .iter_rows()
            .filter(|row| bloc.members.contains(row.entity_name()))
            .map(|row| row.index())
            .collect();
        if rows.is_empty() {
            debug!(label = %bloc.label, "no bloc members in table");
            continue;
        }
        groups.push(Group {
            label: bloc.label.clone(),
            kind: GroupKind::Bloc,
            policy: bloc.policy,
            rows,
        });
    }

    groups
}
