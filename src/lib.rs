//! # Ocean Report Core Library
//!
//! This library assembles a daily "ocean conditions" report from three independent,
//! unreliable public feeds and delivers it by email to a seasonally-varying list of
//! recipients. Each run is stateless: nothing is cached or persisted between runs.
//!
//! ## Data Flow
//! 1. **Fetch**: tides and water temperature from NOAA CO-OPS, hourly wind from
//!    Open-Meteo, and the recipient list from a plain-text URL, all through
//!    [`fetcher::ResilientFetcher`]
//! 2. **Derive**: restrict tides to a daylight window, convert wind units and classify
//!    wind direction against the configured shoreline orientation
//! 3. **Compose**: concatenate water temperature, tides and wind into one text body
//! 4. **Deliver**: send over SMTP with STARTTLS, or print the message in dry-run mode
//!
//! ## Failure Policy
//! - Tide and water temperature are optional. A failed fetch degrades to
//!   [`Fetched::Absent`] or [`Fetched::Failed`] and the report is still sent.
//! - Wind and recipient resolution are required. Their failure aborts the run.
//!
//! ## Core Types
//! - [`TideEvent`]: a single high or low tide prediction
//! - [`WindSample`]: a single hourly wind forecast with derived classifications
//! - [`Fetched`]: tagged result for optional report sections

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod emailer;
pub mod fetcher;
pub mod orchestrator;
pub mod recipients;
pub mod report;
pub mod season;
pub mod tide_data;
pub mod water_temp;
pub mod wind;

#[cfg(test)]
mod tests;

pub use recipients::RecipientList;
pub use season::Season;
pub use wind::WindType;

/// High or low tide extremum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// Parse the NOAA `type` code (`"H"` or `"L"`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "H" => Some(TideKind::High),
            "L" => Some(TideKind::Low),
            _ => None,
        }
    }
}

impl fmt::Display for TideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TideKind::High => f.write_str("High Tide"),
            TideKind::Low => f.write_str("Low Tide"),
        }
    }
}

/// A single predicted tide extremum.
///
/// Timestamps are station-local (NOAA `lst_ldt`) at minute precision and heights
/// are feet above MLLW, so they may be negative on very low tides.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use ocean_report_lib::{TideEvent, TideKind};
///
/// let event = TideEvent {
///     timestamp: NaiveDate::from_ymd_opt(2024, 7, 1)
///         .unwrap()
///         .and_hms_opt(7, 0, 0)
///         .unwrap(),
///     height_ft: 0.5,
///     kind: TideKind::Low,
/// };
/// assert_eq!(event.kind.to_string(), "Low Tide");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    /// Local time of the extremum
    pub timestamp: NaiveDateTime,
    /// Height in feet relative to MLLW
    pub height_ft: f64,
    /// High or low
    pub kind: TideKind,
}

/// One hourly wind forecast sample.
///
/// Only the raw values are stored. Speed in mph, the compass label and the
/// shoreline-relative classification are computed on demand from the raw
/// sample and the shoreline orientation it was created with, so they can never
/// drift out of sync.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindSample {
    timestamp: NaiveDateTime,
    speed_kmh: f64,
    direction_deg: f64,
    beach_facing_deg: f64,
}

impl WindSample {
    pub fn new(
        timestamp: NaiveDateTime,
        speed_kmh: f64,
        direction_deg: f64,
        beach_facing_deg: f64,
    ) -> Self {
        WindSample {
            timestamp,
            speed_kmh,
            direction_deg,
            beach_facing_deg,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    /// Compass bearing the wind blows from
    pub fn direction_deg(&self) -> f64 {
        self.direction_deg
    }

    pub fn speed_mph(&self) -> f64 {
        wind::kmh_to_mph(self.speed_kmh)
    }

    /// 16-point compass label, e.g. `"WNW"`
    pub fn compass(&self) -> &'static str {
        wind::deg_to_compass(self.direction_deg)
    }

    pub fn wind_type(&self) -> WindType {
        wind::classify(self.direction_deg, self.beach_facing_deg)
    }
}

/// Outcome of fetching an optional report section.
///
/// Keeps "the source had nothing" apart from "the fetch crashed" so callers
/// cannot confuse the two, while both still let the report go out.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    /// Data was fetched and parsed
    Ready(T),
    /// The source answered but had no data
    Absent,
    /// Transport or parse failure, with a reason for the log
    Failed(String),
}

impl<T> Fetched<T> {
    /// Convert to an `Option`, dropping the absent/failed distinction.
    pub fn ready(self) -> Option<T> {
        match self {
            Fetched::Ready(value) => Some(value),
            Fetched::Absent | Fetched::Failed(_) => None,
        }
    }
}

impl<T: Default> Fetched<T> {
    /// The fetched value, or an empty default when nothing is available.
    pub fn unwrap_or_default(self) -> T {
        self.ready().unwrap_or_default()
    }
}
