//! Pipeline stages behind the `chartdata` command.
//!
//! Load a table, append region rows, add derived columns, apply filters and
//! render the result. Each stage logs one `info` event with its counts.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chartdata_aggregate::{AggregationSummary, AggregatorOptions, append_region_rows};
use chartdata_ingest::{CsvRowOptions, ImportOptions, import_legacy_str, read_csv_table};
use chartdata_model::{EntityRegistry, PopulationMap, Table};
use chartdata_transform::{DaysSincePolicy, Derivation};
use tracing::{info, info_span, warn};

/// A loaded table and the registry that holds its entity ids.
#[derive(Debug)]
pub struct Loaded {
    pub table: Table,
    pub registry: EntityRegistry,
    /// Messages for legacy variables left out of the table.
    pub skipped: Vec<String>,
}

pub fn load_legacy(path: &Path, options: &ImportOptions) -> Result<Loaded> {
    let _span = info_span!("load_legacy", path = %path.display()).entered();
    let json = fs::read_to_string(path)
        .with_context(|| format!("read legacy JSON {}", path.display()))?;
    let mut registry = EntityRegistry::new();
    let import = import_legacy_str(&json, &mut registry, options)
        .with_context(|| format!("import legacy JSON {}", path.display()))?;
    let skipped: Vec<String> = import.skipped.iter().map(ToString::to_string).collect();
    info!(
        rows = import.table.len(),
        columns = import.table.schema().len(),
        skipped = skipped.len(),
        "loaded legacy table"
    );
    Ok(Loaded {
        table: import.table,
        registry,
        skipped,
    })
}

pub fn load_csv(path: &Path, options: &CsvRowOptions) -> Result<Loaded> {
    let _span = info_span!("load_csv", path = %path.display()).entered();
    let file = File::open(path).with_context(|| format!("open CSV {}", path.display()))?;
    let mut registry = EntityRegistry::new();
    let table = read_csv_table(BufReader::new(file), &mut registry, options)
        .with_context(|| format!("load CSV {}", path.display()))?;
    Ok(Loaded {
        table,
        registry,
        skipped: Vec::new(),
    })
}

/// Read a `{"Entity": population, ...}` JSON file.
pub fn load_population(path: &Path) -> Result<PopulationMap> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("read population file {}", path.display()))?;
    let population: PopulationMap = serde_json::from_str(&json)
        .with_context(|| format!("parse population file {}", path.display()))?;
    info!(entities = population.len(), "loaded population reference");
    Ok(population)
}

/// What to do with a loaded table.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Append continent and bloc rows using `aggregator`.
    pub aggregate: bool,
    pub aggregator: AggregatorOptions,
    /// Applied in order, each with its default column spec.
    pub derivations: Vec<Derivation>,
    pub selected: BTreeSet<String>,
    pub min_population: Option<f64>,
}

impl PipelineOptions {
    #[must_use]
    pub fn with_aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = aggregate;
        self
    }

    #[must_use]
    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivations.push(derivation);
        self
    }

    #[must_use]
    pub fn with_selected(mut self, entity: impl Into<String>) -> Self {
        self.selected.insert(entity.into());
        self
    }

    #[must_use]
    pub fn with_min_population(mut self, min_population: Option<f64>) -> Self {
        self.min_population = min_population;
        self
    }
}

#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub regions: AggregationSummary,
    /// Slugs of the derived columns, in the order they were added.
    pub derived: Vec<String>,
    /// Rows hidden by the population filter.
    pub hidden_rows: usize,
}

/// Aggregate, derive and filter `loaded.table` in place.
pub fn run_pipeline(
    loaded: &mut Loaded,
    population: &PopulationMap,
    options: &PipelineOptions,
) -> Result<PipelineOutcome> {
    let mut outcome = PipelineOutcome::default();

    if options.aggregate {
        outcome.regions =
            append_region_rows(&mut loaded.table, &mut loaded.registry, &options.aggregator)
                .context("aggregate regions")?;
    }

    for derivation in &options.derivations {
        let spec = derivation.default_spec(&loaded.table);
        let slug = spec.slug.clone();
        derivation
            .apply(&mut loaded.table, spec, population)
            .with_context(|| format!("derive column {slug}"))?;
        outcome.derived.push(slug);
    }
    if !outcome.derived.is_empty() {
        info!(columns = ?outcome.derived, "added derived columns");
    }

    if options.min_population.is_some() && population.is_empty() {
        warn!("minimum population set without a population reference; nothing is hidden");
    }
    loaded
        .table
        .apply_filters(&options.selected, options.min_population, population);
    outcome.hidden_rows = (0..loaded.table.len())
        .filter(|&index| loaded.table.is_filtered(index))
        .count();
    Ok(outcome)
}

/// Output encodings for the final table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Delimited,
    /// Pretty-printed schema and rows.
    Json,
}

/// Render the rows left visible by the table's filter.
///
/// A `row_limit` of zero means no cap, as in [`Table::to_delimited`].
pub fn render(
    table: &Table,
    format: OutputFormat,
    delimiter: &str,
    row_limit: Option<usize>,
) -> Result<String> {
    match format {
        OutputFormat::Delimited => Ok(table.to_delimited_visible(delimiter, row_limit)),
        OutputFormat::Json => {
            let mut snapshot = table.visible_snapshot();
            if let Some(limit) = row_limit.filter(|&limit| limit > 0) {
                snapshot.rows.truncate(limit);
            }
            serde_json::to_string_pretty(&snapshot).context("serialize table snapshot")
        }
    }
}

fn split_arg<'a>(text: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    match text.rsplit_once(':') {
        Some((slug, value)) if !slug.trim().is_empty() => Ok((slug.trim(), value.trim())),
        _ => bail!("expected SLUG:{what}, got '{text}'"),
    }
}

/// Parse `SLUG:WINDOW`.
pub fn parse_rolling_average(text: &str) -> Result<Derivation> {
    let (source, window) = split_arg(text, "WINDOW")?;
    let window: u32 = window
        .parse()
        .with_context(|| format!("invalid window '{window}'"))?;
    if window == 0 {
        bail!("rolling-average window must be at least 1");
    }
    Ok(Derivation::RollingAverage {
        source: source.to_string(),
        window,
    })
}

/// Parse `SLUG:SCALE`.
pub fn parse_per_capita(text: &str) -> Result<Derivation> {
    let (source, scale) = split_arg(text, "SCALE")?;
    let scale: f64 = scale
        .parse()
        .with_context(|| format!("invalid scale '{scale}'"))?;
    if !scale.is_finite() || scale <= 0.0 {
        bail!("per-capita scale must be a positive number");
    }
    Ok(Derivation::PerCapita {
        source: source.to_string(),
        scale,
    })
}

/// Parse `SLUG:THRESHOLD`.
pub fn parse_days_since(text: &str, policy: DaysSincePolicy) -> Result<Derivation> {
    let (source, threshold) = split_arg(text, "THRESHOLD")?;
    let threshold: f64 = threshold
        .parse()
        .with_context(|| format!("invalid threshold '{threshold}'"))?;
    Ok(Derivation::DaysSince {
        source: source.to_string(),
        threshold,
        policy,
    })
}
