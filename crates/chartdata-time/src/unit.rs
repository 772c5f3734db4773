//! Year, quarter and day time units.
//!
//! A [`TimeUnit`] is a point on one of three calendars. Arithmetic moves the
//! value along its own calendar (years by year, quarters by quarter with a
//! year carry, days by calendar day with month and leap-year rollover).
//!
//! The string form is the one used in URLs and exports:
//!
//! | Unit    | Example      |
//! |---------|--------------|
//! | Year    | `2010`       |
//! | Quarter | `2010-Q3`    |
//! | Day     | `2010-02-28` |
//!
//! Years are written without zero padding, so `5` and `-44` are valid year
//! strings and every value accepted by the year pattern round-trips.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?[0-9]{1,4})$").expect("Invalid year regex"));

static QUARTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?[0-9]{1,4})-Q([0-9])$").expect("Invalid quarter regex"));

static DAY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9]{1,4})-([0-9]{2})-([0-9]{2})$").expect("Invalid day regex")
});

/// A calendar time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimeUnit {
    Year { year: i32 },
    /// `quarter` is 1-based (1..=4).
    Quarter { year: i32, quarter: u8 },
    /// `month` and `day` are 1-based.
    Day { year: i32, month: u32, day: u32 },
}

/// Returned by [`TimeUnit::from_str`] when no pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized time unit string: {input}")]
pub struct ParseTimeUnitError {
    pub input: String,
}

impl TimeUnit {
    pub fn year(year: i32) -> Self {
        TimeUnit::Year { year }
    }

    /// Build a quarter, rejecting quarters outside 1..=4.
    pub fn quarter(year: i32, quarter: u8) -> Option<Self> {
        (1..=4)
            .contains(&quarter)
            .then_some(TimeUnit::Quarter { year, quarter })
    }

    /// Build a day, rejecting dates that do not exist on the calendar.
    pub fn day(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_date)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        TimeUnit::Day {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// The calendar date of a `Day`, if it names a real date.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match *self {
            TimeUnit::Day { year, month, day } => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        }
    }

    /// Move `amount` steps along this unit's calendar.
    ///
    /// A hand-built `Day` that is not a real calendar date is returned
    /// unchanged. Day arithmetic saturates at the ends of the supported
    /// date range.
    pub fn add(self, amount: i32) -> Self {
        match self {
            TimeUnit::Year { year } => TimeUnit::Year {
                year: year.saturating_add(amount),
            },
            TimeUnit::Quarter { year, quarter } => {
                let sum = i64::from(quarter) - 1 + i64::from(amount);
                let year = i64::from(year) + sum.div_euclid(4);
                TimeUnit::Quarter {
                    year: year.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
                    quarter: (sum.rem_euclid(4) + 1) as u8,
                }
            }
            TimeUnit::Day { .. } => {
                let Some(date) = self.to_date() else {
                    return self;
                };
                let shifted = date
                    .checked_add_signed(Duration::days(i64::from(amount)))
                    .unwrap_or(if amount > 0 {
                        NaiveDate::MAX
                    } else {
                        NaiveDate::MIN
                    });
                Self::from_date(shifted)
            }
        }
    }

    pub fn sub(self, amount: i32) -> Self {
        self.add(amount.saturating_neg())
    }

    pub fn next(self) -> Self {
        self.add(1)
    }

    pub fn prev(self) -> Self {
        self.sub(1)
    }

    /// Parse a time unit string, trying year, then quarter, then day.
    ///
    /// Returns `None` when no pattern matches, or when a quarter or day
    /// matches the pattern but is not a real value (`2010-Q5`, `2010-02-30`).
    pub fn parse(input: &str) -> Option<Self> {
        if let Some(caps) = YEAR_REGEX.captures(input) {
            let year = caps[1].parse().ok()?;
            return Some(TimeUnit::Year { year });
        }
        if let Some(caps) = QUARTER_REGEX.captures(input) {
            let year = caps[1].parse().ok()?;
            let quarter = caps[2].parse().ok()?;
            return TimeUnit::quarter(year, quarter);
        }
        if let Some(caps) = DAY_REGEX.captures(input) {
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;
            return TimeUnit::day(year, month, day);
        }
        None
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Year { year } => write!(f, "{year}"),
            TimeUnit::Quarter { year, quarter } => write!(f, "{year}-Q{quarter}"),
            TimeUnit::Day { year, month, day } => write!(f, "{year}-{month:02}-{day:02}"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ParseTimeUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeUnit::parse(s).ok_or_else(|| ParseTimeUnitError {
            input: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: TimeUnit = TimeUnit::Year { year: 2010 };
    const QUARTER: TimeUnit = TimeUnit::Quarter {
        year: 2010,
        quarter: 3,
    };
    const DAY: TimeUnit = TimeUnit::Day {
        year: 2010,
        month: 2,
        day: 28,
    };

    #[test]
    fn adds_years() {
        assert_eq!(YEAR.add(1), TimeUnit::year(2011));
        assert_eq!(YEAR.sub(1), TimeUnit::year(2009));
    }

    #[test]
    fn adds_quarters_with_year_carry() {
        assert_eq!(QUARTER.add(1), TimeUnit::quarter(2010, 4).unwrap());
        assert_eq!(QUARTER.add(3), TimeUnit::quarter(2011, 2).unwrap());
        assert_eq!(QUARTER.sub(3), TimeUnit::quarter(2009, 4).unwrap());
        assert_eq!(QUARTER.sub(6), TimeUnit::quarter(2009, 1).unwrap());
    }

    #[test]
    fn quarter_arithmetic_does_not_overflow() {
        let quarter = TimeUnit::quarter(2010, 2).unwrap();
        assert_eq!(
            quarter.add(i32::MAX),
            TimeUnit::quarter(536_872_922, 1).unwrap()
        );
        assert_eq!(
            quarter.sub(i32::MAX),
            TimeUnit::quarter(2010 - 536_870_912, 3).unwrap()
        );
    }

    #[test]
    fn adds_days_across_month_end() {
        assert_eq!(DAY.add(1), TimeUnit::day(2010, 3, 1).unwrap());
        assert_eq!(DAY.add(1).to_string(), "2010-03-01");
        assert_eq!(DAY.sub(2), TimeUnit::day(2010, 2, 26).unwrap());
    }

    #[test]
    fn adds_days_in_leap_year() {
        let day = TimeUnit::day(2020, 2, 28).unwrap();
        assert_eq!(day.next().to_string(), "2020-02-29");
        assert_eq!(day.add(2).to_string(), "2020-03-01");
        let new_year = TimeUnit::day(2020, 12, 31).unwrap();
        assert_eq!(new_year.next().to_string(), "2021-01-01");
    }

    #[test]
    fn next_and_prev_are_single_steps() {
        assert_eq!(QUARTER.next().prev(), QUARTER);
        assert_eq!(DAY.prev().to_string(), "2010-02-27");
    }

    #[test]
    fn invalid_day_is_left_unchanged() {
        let bogus = TimeUnit::Day {
            year: 2010,
            month: 2,
            day: 30,
        };
        assert_eq!(bogus.add(1), bogus);
    }

    #[test]
    fn renders_strings() {
        assert_eq!(YEAR.to_string(), "2010");
        assert_eq!(QUARTER.to_string(), "2010-Q3");
        assert_eq!(DAY.to_string(), "2010-02-28");
        assert_eq!(TimeUnit::year(-44).to_string(), "-44");
        assert_eq!(TimeUnit::day(5, 1, 9).unwrap().to_string(), "5-01-09");
    }

    #[test]
    fn parses_strings() {
        assert_eq!(TimeUnit::parse("2010"), Some(YEAR));
        assert_eq!(TimeUnit::parse("2010-Q3"), Some(QUARTER));
        assert_eq!(TimeUnit::parse("2010-02-28"), Some(DAY));
        assert_eq!(TimeUnit::parse("-500"), Some(TimeUnit::year(-500)));
    }

    #[test]
    fn rejects_invalid_strings() {
        assert_eq!(TimeUnit::parse("+-123"), None);
        assert_eq!(TimeUnit::parse(""), None);
        assert_eq!(TimeUnit::parse("12345"), None);
        assert_eq!(TimeUnit::parse("2010-Q5"), None);
        assert_eq!(TimeUnit::parse("2010-Q0"), None);
        assert_eq!(TimeUnit::parse("2010-02-30"), None);
        assert_eq!(TimeUnit::parse("2010-2-28"), None);
        assert!("2010-W1".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(DAY).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "day", "year": 2010, "month": 2, "day": 28})
        );
        let back: TimeUnit = serde_json::from_value(json).unwrap();
        assert_eq!(back, DAY);
    }
}
