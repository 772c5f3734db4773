//! Integer day offsets relative to the epoch date.
//!
//! Day-indexed series store time as whole days since an epoch date. Every
//! table in a process uses the same epoch ([`epoch_date`]) so that series
//! imported with different zero days can be joined on the `day` column.

use chrono::{Duration, NaiveDate};

/// The process-wide epoch date in ISO form.
pub const EPOCH_DATE_ISO: &str = "2020-01-21";

const EPOCH_YEAR: i32 = 2020;
const EPOCH_MONTH: u32 = 1;
const EPOCH_DAY: u32 = 21;

/// The process-wide epoch date.
pub fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(EPOCH_YEAR, EPOCH_MONTH, EPOCH_DAY).unwrap_or(NaiveDate::MIN)
}

/// Parse a `YYYY-MM-DD` date, ignoring any trailing time component.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    let (date_part, _) = trimmed.split_once('T')?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Signed whole-day difference `a - b` between two ISO dates.
///
/// Returns `None` if either side is not a complete date.
pub fn diff_iso_dates_in_days(a: &str, b: &str) -> Option<i64> {
    let a = parse_iso_date(a)?;
    let b = parse_iso_date(b)?;
    Some((a - b).num_days())
}

pub fn date_to_day_offset(date: NaiveDate, epoch: NaiveDate) -> i64 {
    (date - epoch).num_days()
}

pub fn day_offset_to_date(offset: i64, epoch: NaiveDate) -> Option<NaiveDate> {
    epoch.checked_add_signed(Duration::try_days(offset)?)
}
