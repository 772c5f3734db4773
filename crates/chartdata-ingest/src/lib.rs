//! Loading chart tables from raw inputs.
//!
//! - **legacy**: the variable/entity-key JSON format, outer joined into a
//!   wide table with one column per variable
//! - **csv_rows**: wide CSV records normalized into rows with entity
//!   identity and epoch-based `day` values

pub mod annotations;
pub mod csv_rows;
pub mod error;
pub mod legacy;
pub mod slug;

pub use annotations::parse_entity_annotations;
pub use csv_rows::{
    CsvRecord, CsvRowOptions, normalize_csv_rows, read_csv_records, read_csv_table,
};
pub use error::{IngestError, Result};
pub use legacy::{
    ImportOptions, LegacyEntityMeta, LegacyImport, LegacyVariable, LegacyVariablesAndEntityKey,
    import_legacy, import_legacy_str,
};
pub use slug::slugify;
