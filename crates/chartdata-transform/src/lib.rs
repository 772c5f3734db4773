//! Derived columns computed from existing table columns.
//!
//! - **rolling**: trailing rolling averages per entity
//! - **per_capita**: values normalized by a population reference
//! - **days_since**: elapsed time since an entity first reached a threshold
//! - **derivation**: a serializable description dispatching to the above
//! - **metric**: column specs and trajectory presets for COVID metrics
//!
//! Every builder adds its column through
//! [`Table::add_column`](chartdata_model::Table::add_column), so protected
//! slugs are rejected and re-applying a derivation overwrites the column.

pub mod days_since;
pub mod derivation;
pub mod error;
pub mod metric;
pub mod per_capita;
pub mod rolling;

use chartdata_model::Table;

pub use days_since::{DaysSincePolicy, add_days_since_column};
pub use derivation::Derivation;
pub use error::{Result, TransformError};
pub use metric::{
    MetricKind, MetricOptions, TrajectoryPreset, metric_column_spec, metric_display_name,
    metric_slug, metric_variable_id, trajectory_preset,
};
pub use per_capita::add_per_capita_column;
pub use rolling::add_rolling_average_column;

pub(crate) fn require_source(table: &Table, slug: &str) -> Result<()> {
    if table.has_column(slug) {
        Ok(())
    } else {
        Err(TransformError::MissingSourceColumn {
            slug: slug.to_string(),
        })
    }
}
