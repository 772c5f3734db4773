use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chartdata_aggregate::AggregatorOptions;
use chartdata_cli::pipeline::{
    Loaded, OutputFormat, PipelineOptions, load_csv, load_legacy, load_population,
    parse_days_since, parse_per_capita, parse_rolling_average, render, run_pipeline,
};
use chartdata_ingest::{CsvRowOptions, ImportOptions};
use chartdata_model::PopulationMap;
use chartdata_transform::DaysSincePolicy;
use tracing::info;

use crate::cli::{CsvArgs, LegacyArgs, OutputFormatArg, PipelineArgs};
use crate::types::RunResult;

pub fn run_legacy(args: &LegacyArgs) -> Result<RunResult> {
    let loaded = load_legacy(&args.input, &ImportOptions::default())?;
    finish(&args.input, loaded, &args.pipeline)
}

pub fn run_csv(args: &CsvArgs) -> Result<RunResult> {
    let options = args
        .drop_locations
        .iter()
        .fold(CsvRowOptions::default(), |options, location| {
            options.with_dropped_location(location.as_str())
        });
    let loaded = load_csv(&args.input, &options)?;
    finish(&args.input, loaded, &args.pipeline)
}

fn finish(input: &Path, mut loaded: Loaded, args: &PipelineArgs) -> Result<RunResult> {
    let population = match &args.population {
        Some(path) => load_population(path)?,
        None => PopulationMap::default(),
    };
    let options = pipeline_options(args)?;
    let outcome = run_pipeline(&mut loaded, &population, &options)?;

    let format = match args.format {
        OutputFormatArg::Delimited => OutputFormat::Delimited,
        OutputFormatArg::Json => OutputFormat::Json,
    };
    let rendered = render(&loaded.table, format, &args.delimiter, args.row_limit)?;
    write_output(args.output.as_deref(), &rendered)?;

    Ok(RunResult {
        input: input.to_path_buf(),
        output: args.output.clone(),
        rows: loaded.table.len(),
        columns: loaded.table.schema().len(),
        entities: loaded.registry.len(),
        synthetic_entities: loaded
            .registry
            .iter()
            .filter(|entity| entity.synthetic)
            .count(),
        hidden_rows: outcome.hidden_rows,
        regions: outcome.regions,
        derived: outcome.derived,
        skipped: loaded.skipped,
    })
}

/// Derivations run rolling averages first, then per-capita, then days-since,
/// so later flags can name columns added by earlier ones.
fn pipeline_options(args: &PipelineArgs) -> Result<PipelineOptions> {
    let mut aggregator = AggregatorOptions::default();
    if args.no_bloc {
        aggregator = aggregator.with_blocs(Vec::new());
    }
    let policy = if args.exclude_below_threshold {
        DaysSincePolicy::ExcludeBelowThreshold
    } else {
        DaysSincePolicy::KeepAfterStart
    };

    let mut options = PipelineOptions {
        aggregator,
        ..PipelineOptions::default()
    }
    .with_aggregate(args.aggregate)
    .with_min_population(args.min_population);
    for entity in &args.select {
        options = options.with_selected(entity.as_str());
    }
    for text in &args.rolling_average {
        options = options
            .with_derivation(parse_rolling_average(text).context("--rolling-average")?);
    }
    for text in &args.per_capita {
        options = options.with_derivation(parse_per_capita(text).context("--per-capita")?);
    }
    for text in &args.days_since {
        options =
            options.with_derivation(parse_days_since(text, policy).context("--days-since")?);
    }
    Ok(options)
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), "wrote table");
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}").context("write table to stdout")?;
        }
    }
    Ok(())
}
