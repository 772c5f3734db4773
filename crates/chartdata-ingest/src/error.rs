//! Error types for chart data ingestion.

use chartdata_model::TableError;
use thiserror::Error;

/// Errors raised while importing legacy variables or CSV rows.
#[derive(Debug, Error)]
pub enum IngestError {
    // === Legacy variable errors ===
    /// The parallel `years`/`entities`/`values` arrays differ in length.
    #[error(
        "variable {variable_id} has {years} years, {entities} entities and {values} values"
    )]
    LengthMismatch {
        variable_id: i64,
        years: usize,
        entities: usize,
        values: usize,
    },

    /// An entity id is absent from the entity key.
    #[error("variable {variable_id} references unknown entity {entity_id}")]
    UnknownEntity { variable_id: i64, entity_id: i64 },

    /// `display.zeroDay` is not an ISO date.
    #[error("variable {variable_id} has invalid zero day '{value}'")]
    InvalidZeroDay { variable_id: i64, value: String },

    // === CSV row errors ===
    #[error("row {row} is missing required field '{field}'")]
    MissingField { row: usize, field: String },

    #[error("row {row} has invalid date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    // === Wrapped errors ===
    #[error("invalid legacy JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl IngestError {
    /// Errors that only invalidate one legacy variable.
    pub fn is_variable_local(&self) -> bool {
        matches!(
            self,
            IngestError::LengthMismatch { .. }
                | IngestError::UnknownEntity { .. }
                | IngestError::InvalidZeroDay { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::LengthMismatch {
            variable_id: 3,
            years: 2,
            entities: 2,
            values: 1,
        };
        assert_eq!(
            err.to_string(),
            "variable 3 has 2 years, 2 entities and 1 values"
        );
        assert!(err.is_variable_local());
        let err = IngestError::MissingField {
            row: 4,
            field: "location".to_string(),
        };
        assert!(!err.is_variable_local());
    }
}
