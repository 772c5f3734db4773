//! Error types for table construction and mutation.

use thiserror::Error;

/// Errors raised while building or mutating a [`Table`](crate::Table).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// `add_column` targeted an identity or time slug.
    #[error("column slug '{slug}' is reserved for row identity or time")]
    ProtectedSlug { slug: String },

    #[error("row {row} has no entityName")]
    MissingEntityName { row: usize },

    #[error("row {row} has neither a year nor a day")]
    MissingTimeField { row: usize },

    /// A row carries both `year` and `day`.
    #[error("row {row} has both a year and a day")]
    TimeFieldConflict { row: usize },

    /// Two rows for the same entity disagree on its id or code.
    #[error("entity '{entity}' has conflicting {field}: '{expected}' vs '{found}'")]
    EntityIdentityConflict {
        entity: String,
        field: &'static str,
        expected: String,
        found: String,
    },

    /// A real entity was registered after synthetic ids were handed out.
    #[error("cannot register entity '{entity}' after synthetic entities were allocated")]
    RegistrySealed { entity: String },

    #[error("entity '{entity}' is already registered")]
    DuplicateEntity { entity: String },
}

pub type Result<T> = std::result::Result<T, TableError>;
