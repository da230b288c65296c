//! Summer/offseason determination.
//!
//! The authoritative policy is [`AnchorDateCalendar`]: summer runs from Memorial Day
//! to Labor Day, each shifted by a configured number of days. [`MonthRangeCalendar`]
//! is the coarse June–September check, kept as a named alternative for tests and
//! never combined with the anchor-date policy.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

use crate::config::SummerConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Season {
    Summer,
    Offseason,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Summer => f.write_str("summer"),
            Season::Offseason => f.write_str("offseason"),
        }
    }
}

/// Maps a calendar date to a season.
pub trait SeasonCalendar: Send + Sync {
    fn season_on(&self, date: NaiveDate) -> Season;
}

/// Last Monday on or before May 31.
pub fn memorial_day(year: i32) -> Option<NaiveDate> {
    let may_31 = NaiveDate::from_ymd_opt(year, 5, 31)?;
    let back = may_31.weekday().num_days_from_monday() as i64;
    Some(may_31 - Duration::days(back))
}

/// First Monday on or after September 1.
pub fn labor_day(year: i32) -> Option<NaiveDate> {
    let sep_1 = NaiveDate::from_ymd_opt(year, 9, 1)?;
    let forward = (7 - sep_1.weekday().num_days_from_monday() as i64) % 7;
    Some(sep_1 + Duration::days(forward))
}

/// Summer is `[memorial_day + memorial_offset, labor_day + labor_offset]`, inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorDateCalendar {
    pub memorial_day_offset: i64,
    pub labor_day_offset: i64,
}

impl AnchorDateCalendar {
    pub fn from_config(summer: &SummerConfig) -> Self {
        AnchorDateCalendar {
            memorial_day_offset: summer.memorial_day_offset,
            labor_day_offset: summer.labor_day_offset,
        }
    }

    /// First and last day of summer in `year`.
    pub fn summer_window(&self, year: i32) -> Option<(NaiveDate, NaiveDate)> {
        let start = memorial_day(year)? + Duration::days(self.memorial_day_offset);
        let end = labor_day(year)? + Duration::days(self.labor_day_offset);
        Some((start, end))
    }
}

impl SeasonCalendar for AnchorDateCalendar {
    fn season_on(&self, date: NaiveDate) -> Season {
        match self.summer_window(date.year()) {
            Some((start, end)) if start <= date && date <= end => Season::Summer,
            _ => Season::Offseason,
        }
    }
}

/// Coarse policy: June through September is summer.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonthRangeCalendar;

impl SeasonCalendar for MonthRangeCalendar {
    fn season_on(&self, date: NaiveDate) -> Season {
        if (6..=9).contains(&date.month()) {
            Season::Summer
        } else {
            Season::Offseason
        }
    }
}
