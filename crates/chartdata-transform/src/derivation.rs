//! Declarative description of a derived column.

use chartdata_model::{ColumnSpec, PopulationMap, Table};
use serde::{Deserialize, Serialize};

use crate::days_since::{DaysSincePolicy, add_days_since_column};
use crate::error::Result;
use crate::per_capita::add_per_capita_column;
use crate::rolling::add_rolling_average_column;

/// A derived column to compute from an existing source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    RollingAverage {
        source: String,
        window: u32,
    },
    PerCapita {
        source: String,
        scale: f64,
    },
    DaysSince {
        source: String,
        threshold: f64,
        #[serde(default)]
        policy: DaysSincePolicy,
    },
}

impl Derivation {
    pub fn source(&self) -> &str {
        match self {
            Derivation::RollingAverage { source, .. }
            | Derivation::PerCapita { source, .. }
            | Derivation::DaysSince { source, .. } => source,
        }
    }

    /// Slug used when the caller does not supply a spec.
    pub fn default_slug(&self) -> String {
        match self {
            Derivation::RollingAverage { source, window } => format!("{source}-{window}DayAvg"),
            Derivation::PerCapita { source, scale } => {
                let suffix = if *scale == 1e3 {
                    "perThousand".to_string()
                } else if *scale == 1e6 {
                    "perMil".to_string()
                } else {
                    format!("per{scale}")
                };
                format!("{source}-{suffix}")
            }
            Derivation::DaysSince { source, threshold, .. } => {
                format!("daysSince-{source}-{threshold}")
            }
        }
    }

    /// Spec for [`default_slug`](Self::default_slug), carrying over the
    /// source column's unit and daily flag.
    pub fn default_spec(&self, table: &Table) -> ColumnSpec {
        let mut spec = ColumnSpec::new(self.default_slug());
        if let Some(source) = table.spec(self.source()) {
            spec.is_daily_measurement = source.is_daily_measurement;
            if !matches!(self, Derivation::DaysSince { .. }) {
                spec.unit = source.unit.clone();
            }
        }
        spec
    }

    /// Compute the column and add it to `table` under `spec`.
    ///
    /// `population` is only read by per-capita derivations.
    pub fn apply(
        &self,
        table: &mut Table,
        spec: ColumnSpec,
        population: &PopulationMap,
    ) -> Result<()> {
        match self {
            Derivation::RollingAverage { source, window } => {
                add_rolling_average_column(table, spec, source, *window)
            }
            Derivation::PerCapita { source, scale } => {
                add_per_capita_column(table, spec, source, population, *scale)
            }
            Derivation::DaysSince {
                source,
                threshold,
                policy,
            } => add_days_since_column(table, spec, source, *threshold, *policy),
        }
    }
}
