//! Columnar tables of entity/time observations.
//!
//! A [`Table`] stores rows column-wise under a slug-keyed [`Schema`] of
//! [`ColumnSpec`]s. Rows enter through [`Table::new`] or
//! [`Table::append_rows`] and are checked for identity and time-field
//! consistency; derived columns are added with [`Table::add_column`].
//! Readers go through [`Column`] views, which only see defined and
//! unfiltered cells.

pub mod cell;
pub mod column;
pub mod entity;
pub mod error;
pub mod export;
pub mod population;
pub mod row;
pub mod schema;
pub mod spec;
pub mod table;

pub use cell::CellValue;
pub use column::Column;
pub use entity::{EntityInfo, EntityRegistry};
pub use error::{Result, TableError};
pub use export::TableSnapshot;
pub use population::PopulationMap;
pub use row::Row;
pub use schema::{Schema, TimeField, annotation_slug, is_protected_slug, slugs};
pub use spec::{ColumnSpec, DisplaySettings, SourceInfo};
pub use table::{FilterState, RowView, Table};
