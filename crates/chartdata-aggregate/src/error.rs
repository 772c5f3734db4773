//! Error types for region aggregation.

use chartdata_model::TableError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    /// A constituent row lacks the table's time field.
    #[error("row {row} for '{entity}' has no {field} value")]
    MissingTimeField {
        row: usize,
        entity: String,
        field: &'static str,
    },

    /// A group label already names a real entity.
    #[error("group label '{label}' is already used by an entity")]
    NameCollision { label: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

pub type Result<T> = std::result::Result<T, AggregateError>;
