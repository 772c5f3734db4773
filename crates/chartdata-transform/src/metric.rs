//! Column specs for the COVID metric columns and their trajectory presets.

use std::fmt;

use chartdata_model::{ColumnSpec, DisplaySettings, SourceInfo};
use serde::{Deserialize, Serialize};

const VARIABLE_ID_PREFIX: &str = "1145";

/// The metrics a COVID table can chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Tests,
    Cases,
    Deaths,
    PositiveTestRate,
    CaseFatalityRate,
    TestsPerCase,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Tests,
        MetricKind::Cases,
        MetricKind::Deaths,
        MetricKind::PositiveTestRate,
        MetricKind::CaseFatalityRate,
        MetricKind::TestsPerCase,
    ];

    /// Position used when building variable ids.
    pub fn ordinal(self) -> u8 {
        match self {
            MetricKind::Tests => 0,
            MetricKind::Cases => 1,
            MetricKind::Deaths => 2,
            MetricKind::PositiveTestRate => 3,
            MetricKind::CaseFatalityRate => 4,
            MetricKind::TestsPerCase => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Tests => "tests",
            MetricKind::Cases => "cases",
            MetricKind::Deaths => "deaths",
            MetricKind::PositiveTestRate => "positive_test_rate",
            MetricKind::CaseFatalityRate => "case_fatality_rate",
            MetricKind::TestsPerCase => "tests_per_case",
        }
    }

    fn base_name(self) -> &'static str {
        match self {
            MetricKind::Tests => "tests",
            MetricKind::Cases => "confirmed cases",
            MetricKind::Deaths => "confirmed deaths",
            MetricKind::PositiveTestRate => "positive test rate",
            MetricKind::CaseFatalityRate => "case fatality rate",
            MetricKind::TestsPerCase => "tests per confirmed case",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            MetricKind::Tests => "tests",
            MetricKind::Cases => "cases",
            MetricKind::Deaths => "deaths",
            MetricKind::PositiveTestRate | MetricKind::CaseFatalityRate => "%",
            MetricKind::TestsPerCase => "tests per case",
        }
    }

    fn is_rate(self) -> bool {
        matches!(self, MetricKind::PositiveTestRate | MetricKind::CaseFatalityRate)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which variant of a metric a derived column shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricOptions {
    pub kind: MetricKind,
    /// 1 for absolute values, 1000 or 1000000 for per-capita scales.
    pub per_capita: u32,
    pub daily: bool,
    /// Rolling-average window in days; `None` or 0 for raw values.
    pub rolling_average: Option<u32>,
}

impl MetricOptions {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            per_capita: 1,
            daily: false,
            rolling_average: None,
        }
    }

    #[must_use]
    pub fn with_per_capita(mut self, per_capita: u32) -> Self {
        self.per_capita = per_capita;
        self
    }

    #[must_use]
    pub fn with_daily(mut self, daily: bool) -> Self {
        self.daily = daily;
        self
    }

    #[must_use]
    pub fn with_rolling_average(mut self, window: u32) -> Self {
        self.rolling_average = Some(window);
        self
    }

    fn window(&self) -> Option<u32> {
        self.rolling_average.filter(|&window| window > 0)
    }
}

/// Variable id for a derived metric column.
///
/// The decimal digits of `1145`, the kind ordinal, the daily flag, the
/// per-capita scale and the rolling window (if any), concatenated. Returns
/// `None` if the result does not fit in an `i64`.
pub fn metric_variable_id(options: &MetricOptions) -> Option<i64> {
    let window = options.window().map(|w| w.to_string()).unwrap_or_default();
    format!(
        "{VARIABLE_ID_PREFIX}{}{}{}{window}",
        options.kind.ordinal(),
        u8::from(options.daily),
        options.per_capita,
    )
    .parse()
    .ok()
}

/// Slug such as `cases-perMil-daily-7DayAvg`.
pub fn metric_slug(options: &MetricOptions) -> String {
    let mut parts = vec![options.kind.as_str().to_string()];
    match options.per_capita {
        1_000 => parts.push("perThousand".to_string()),
        1_000_000 => parts.push("perMil".to_string()),
        _ => {}
    }
    parts.push(if options.daily { "daily" } else { "cumulative" }.to_string());
    if let Some(window) = options.window() {
        parts.push(format!("{window}DayAvg"));
    }
    parts.join("-")
}

/// Reader-facing name such as `Daily confirmed cases per million people`.
pub fn metric_display_name(options: &MetricOptions) -> String {
    let prefix = if options.daily { "Daily" } else { "Cumulative" };
    let suffix = match options.per_capita {
        1_000 => " per thousand people",
        1_000_000 => " per million people",
        _ => "",
    };
    format!("{prefix} {}{suffix}", options.kind.base_name())
}

fn decimal_places(options: &MetricOptions) -> u32 {
    if options.per_capita > 1 {
        2
    } else if options.kind.is_rate() || options.window().is_some_and(|window| window > 1) {
        1
    } else {
        0
    }
}

/// Full column spec for a derived metric column.
///
/// `updated` is appended to the source name, e.g. a last-updated stamp.
pub fn metric_column_spec(options: &MetricOptions, updated: Option<&str>) -> ColumnSpec {
    let name = metric_display_name(options);
    let source = SourceInfo {
        name: Some(format!(
            "Our World in Data COVID-19 dataset{}",
            updated.unwrap_or_default()
        )),
        ..SourceInfo::default()
    };
    let display = DisplaySettings {
        name: Some(name.clone()),
        unit: Some(options.kind.unit().to_string()),
        num_decimal_places: Some(decimal_places(options)),
        ..DisplaySettings::default()
    };
    let mut spec = ColumnSpec::new(metric_slug(options))
        .with_name(name)
        .with_unit(options.kind.unit())
        .with_daily_measurement(true)
        .with_display(display)
        .with_source(source);
    spec.owid_variable_id = metric_variable_id(options);
    spec
}

/// Title, threshold and source column of a days-since chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPreset {
    pub title: &'static str,
    pub threshold: f64,
    pub id: i64,
    pub source_column: &'static str,
}

impl TrajectoryPreset {
    /// Column spec for the days-since column this preset describes.
    pub fn column_spec(&self) -> ColumnSpec {
        ColumnSpec::new(format!("daysSince{}", self.id))
            .with_name(self.title)
            .with_unit("days")
            .with_variable_id(self.id)
            .with_daily_measurement(true)
    }
}

/// Days-since preset for a metric.
///
/// Only cases have dedicated presets; every other metric uses the deaths
/// presets. Per-capita takes precedence over daily.
pub fn trajectory_preset(kind: MetricKind, daily: bool, per_capita: bool) -> TrajectoryPreset {
    let cases = kind == MetricKind::Cases;
    match (cases, per_capita, daily) {
        (false, false, false) => TrajectoryPreset {
            title: "Days since the 5th total confirmed death",
            threshold: 5.0,
            id: 4561,
            source_column: "total_deaths",
        },
        (false, false, true) => TrajectoryPreset {
            title: "Days since 5 daily new deaths first reported",
            threshold: 5.0,
            id: 4562,
            source_column: "new_deaths",
        },
        (false, true, _) => TrajectoryPreset {
            title: "Days since total confirmed deaths reached 0.1 per million",
            threshold: 0.1,
            id: 4563,
            source_column: "new_deaths",
        },
        (true, false, false) => TrajectoryPreset {
            title: "Days since the 100th confirmed case",
            threshold: 100.0,
            id: 4564,
            source_column: "total_cases",
        },
        (true, false, true) => TrajectoryPreset {
            title: "Days since confirmed cases first reached 30 per day",
            threshold: 30.0,
            id: 4565,
            source_column: "new_cases",
        },
        (true, true, _) => TrajectoryPreset {
            title: "Days since the total confirmed cases per million people reached 1",
            threshold: 1.0,
            id: 4566,
            source_column: "new_cases",
        },
    }
}
