//! Grouping policies and aggregator configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Member countries of the default bloc.
pub const EUROPEAN_UNION_MEMBERS: [&str; 27] = [
    "Austria",
    "Belgium",
    "Bulgaria",
    "Croatia",
    "Cyprus",
    "Czech Republic",
    "Denmark",
    "Estonia",
    "Finland",
    "France",
    "Germany",
    "Greece",
    "Hungary",
    "Ireland",
    "Italy",
    "Latvia",
    "Lithuania",
    "Luxembourg",
    "Malta",
    "Netherlands",
    "Poland",
    "Portugal",
    "Romania",
    "Slovakia",
    "Slovenia",
    "Spain",
    "Sweden",
];

/// How one group's date buckets are turned into synthetic rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Report the running maximum of summed population instead of each
    /// bucket's raw sum.
    pub sticky_population: bool,
    /// Number of most recent buckets discarded before rows are emitted.
    pub drop_latest_buckets: usize,
}

impl AggregationPolicy {
    /// Continents keep every bucket.
    pub fn continent() -> Self {
        Self {
            sticky_population: true,
            drop_latest_buckets: 0,
        }
    }

    /// Blocs drop their latest bucket, which lags behind member reporting.
    pub fn bloc() -> Self {
        Self {
            sticky_population: true,
            drop_latest_buckets: 1,
        }
    }

    #[must_use]
    pub fn with_sticky_population(mut self, sticky: bool) -> Self {
        self.sticky_population = sticky;
        self
    }

    #[must_use]
    pub fn with_drop_latest_buckets(mut self, count: usize) -> Self {
        self.drop_latest_buckets = count;
        self
    }
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self::continent()
    }
}

/// A named group of entities aggregated regardless of continent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocDefinition {
    pub label: String,
    pub members: BTreeSet<String>,
    #[serde(default = "AggregationPolicy::bloc")]
    pub policy: AggregationPolicy,
}

impl BlocDefinition {
    pub fn new(
        label: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            label: label.into(),
            members: members.into_iter().map(Into::into).collect(),
            policy: AggregationPolicy::bloc(),
        }
    }

    pub fn european_union() -> Self {
        Self::new("European Union", EUROPEAN_UNION_MEMBERS)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A daily measure summed per bucket, with an optional running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummedMeasure {
    pub daily: String,
    pub total: Option<String>,
}

impl SummedMeasure {
    pub fn new(daily: impl Into<String>, total: impl Into<String>) -> Self {
        Self {
            daily: daily.into(),
            total: Some(total.into()),
        }
    }
}

/// Columns read from constituents and written on synthetic rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateMeasures {
    pub population: String,
    pub summed: Vec<SummedMeasure>,
}

impl Default for AggregateMeasures {
    fn default() -> Self {
        Self {
            population: "population".to_string(),
            summed: vec![
                SummedMeasure::new("new_cases", "total_cases"),
                SummedMeasure::new("new_deaths", "total_deaths"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorOptions {
    /// Text column holding each row's continent label.
    pub continent_key: String,
    /// Build one group per continent label.
    pub continents: bool,
    pub continent_policy: AggregationPolicy,
    /// Blocs, processed after the continents in this order.
    pub blocs: Vec<BlocDefinition>,
    pub measures: AggregateMeasures,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            continent_key: "continent".to_string(),
            continents: true,
            continent_policy: AggregationPolicy::continent(),
            blocs: vec![BlocDefinition::european_union()],
            measures: AggregateMeasures::default(),
        }
    }
}

impl AggregatorOptions {
    #[must_use]
    pub fn with_continent_key(mut self, key: impl Into<String>) -> Self {
        self.continent_key = key.into();
        self
    }

    #[must_use]
    pub fn with_continents(mut self, enabled: bool) -> Self {
        self.continents = enabled;
        self
    }

    #[must_use]
    pub fn with_continent_policy(mut self, policy: AggregationPolicy) -> Self {
        self.continent_policy = policy;
        self
    }

    /// Replace the bloc list.
    #[must_use]
    pub fn with_blocs(mut self, blocs: Vec<BlocDefinition>) -> Self {
        self.blocs = blocs;
        self
    }

    #[must_use]
    pub fn with_bloc(mut self, bloc: BlocDefinition) -> Self {
        self.blocs.push(bloc);
        self
    }

    #[must_use]
    pub fn with_measures(mut self, measures: AggregateMeasures) -> Self {
        self.measures = measures;
        self
    }
}
