//! CLI argument definitions for `chartdata`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "chartdata",
    version,
    about = "Build chart tables from legacy JSON or wide CSV data",
    long_about = "Build chart tables from legacy variable JSON or wide CSV data.\n\n\
                  Optionally appends continent and European Union rows, adds rolling \
                  average, per-capita and days-since columns, and writes the table as \
                  delimited text or JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a legacy variables-and-entity-key JSON document.
    Legacy(LegacyArgs),

    /// Load a wide CSV file with one row per location and date.
    Csv(CsvArgs),
}

#[derive(Parser)]
pub struct LegacyArgs {
    /// Path to the legacy JSON document.
    #[arg(value_name = "JSON")]
    pub input: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Parser)]
pub struct CsvArgs {
    /// Path to the CSV file.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Discard every row for this location (repeatable).
    #[arg(long = "drop-location", value_name = "NAME")]
    pub drop_locations: Vec<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args)]
pub struct PipelineArgs {
    /// Append continent and European Union rows.
    #[arg(long = "aggregate")]
    pub aggregate: bool,

    /// Skip the European Union rows when aggregating.
    #[arg(long = "no-bloc", requires = "aggregate")]
    pub no_bloc: bool,

    /// Add a trailing rolling average of SLUG over WINDOW time steps.
    #[arg(long = "rolling-average", value_name = "SLUG:WINDOW")]
    pub rolling_average: Vec<String>,

    /// Add SLUG divided by population and multiplied by SCALE.
    #[arg(long = "per-capita", value_name = "SLUG:SCALE")]
    pub per_capita: Vec<String>,

    /// Add days since SLUG first reached THRESHOLD.
    #[arg(long = "days-since", value_name = "SLUG:THRESHOLD")]
    pub days_since: Vec<String>,

    /// Leave days-since cells empty once the source drops below the threshold.
    #[arg(long = "exclude-below-threshold")]
    pub exclude_below_threshold: bool,

    /// JSON object mapping entity names to population.
    #[arg(long = "population", value_name = "FILE")]
    pub population: Option<PathBuf>,

    /// Entity kept regardless of the population filter (repeatable).
    #[arg(long = "select", value_name = "NAME")]
    pub select: Vec<String>,

    /// Hide entities whose population is below N.
    #[arg(long = "min-population", value_name = "N")]
    pub min_population: Option<f64>,

    /// Output encoding.
    #[arg(long = "format", value_enum, default_value = "delimited")]
    pub format: OutputFormatArg,

    /// Field delimiter for delimited output.
    #[arg(long = "delimiter", default_value = ",")]
    pub delimiter: String,

    /// Write at most N visible data rows (0 writes all).
    #[arg(long = "row-limit", value_name = "N")]
    pub row_limit: Option<usize>,

    /// Write the table here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Delimited,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
