//! Calendar time handling for chart tables.
//!
//! - **unit**: [`TimeUnit`] values (year, quarter, day) with calendar
//!   arithmetic and a compact string form (`2010`, `2010-Q3`, `2010-02-28`)
//! - **epoch**: conversion between calendar dates and integer day offsets
//!   relative to the process-wide epoch date
//!
//! Everything here is proleptic Gregorian without time-of-day or timezone.

pub mod epoch;
pub mod unit;

pub use epoch::{
    EPOCH_DATE_ISO, date_to_day_offset, day_offset_to_date, diff_iso_dates_in_days, epoch_date,
    parse_iso_date,
};
pub use unit::{ParseTimeUnitError, TimeUnit};
