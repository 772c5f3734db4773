//! Region aggregation for chart tables.
//!
//! Builds synthetic entities (one per continent label and one per
//! configured bloc) whose rows sum their constituents per time value.
//! Cumulative columns are recomputed from the summed daily values rather
//! than summed from constituents, and population can be held at its
//! running maximum so members that stop reporting stay counted.

pub mod error;
pub mod options;
pub mod regions;

pub use error::{AggregateError, Result};
pub use options::{
    AggregateMeasures, AggregationPolicy, AggregatorOptions, BlocDefinition,
    EUROPEAN_UNION_MEMBERS, SummedMeasure,
};
pub use regions::{
    AggregationSummary, Bucket, GroupKind, GroupSummary, append_region_rows, reduce_group,
    region_code,
};
