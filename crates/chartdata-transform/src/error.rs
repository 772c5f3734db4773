//! Error types for derived column computation.

use chartdata_model::TableError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Per-capita normalization needs a population for every entity with data.
    #[error("no population reference for entity '{entity}'")]
    MissingPopulation { entity: String },

    #[error("source column '{slug}' does not exist")]
    MissingSourceColumn { slug: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
