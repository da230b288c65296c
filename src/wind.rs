//! # Wind Forecast and Shoreline Classification
//!
//! Hourly 10 m wind from Open-Meteo, reduced to a few key times of today and
//! classified relative to the direction the beach faces.
//!
//! ## Classification
//!
//! Wind direction is the compass bearing the wind blows **from**. The beach
//! orientation is the bearing the shoreline faces, looking out to sea. Wind coming
//! from the same bearing the beach faces blows from the sea onto land (onshore) and
//! chops up the surf; wind from the opposite bearing is offshore.
//!
//! | Shortest angle to facing | Label            |
//! |--------------------------|------------------|
//! | ≤ 22.5°                  | `Onshore`        |
//! | ≤ 67.5°                  | `Cross/Onshore`  |
//! | ≤ 112.5°                 | `Cross-shore`    |
//! | ≤ 157.5°                 | `Cross/Offshore` |
//! | otherwise                | `Offshore`       |
//!
//! Boundary values belong to the lower bucket.
//!
//! ## Failure policy
//! Unlike tides and temperature, a wind fetch or decode failure is returned as a
//! [`WindError`] and aborts the report.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::fetcher::{FetchError, ResilientFetcher};
use crate::WindSample;

/// km/h to mph
const KMH_TO_MPH: f64 = 0.621371;

/// 16-point compass rose, clockwise from north
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

#[derive(Error, Debug)]
pub enum WindError {
    #[error("error fetching wind data: {0}")]
    Fetch(#[from] FetchError),

    #[error("malformed wind forecast: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed wind forecast timestamp {0:?}")]
    Timestamp(String),
}

/// Wind direction relative to the shoreline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindType {
    Onshore,
    CrossOnshore,
    CrossShore,
    CrossOffshore,
    Offshore,
}

impl WindType {
    pub fn label(&self) -> &'static str {
        match self {
            WindType::Onshore => "Onshore",
            WindType::CrossOnshore => "Cross/Onshore",
            WindType::CrossShore => "Cross-shore",
            WindType::CrossOffshore => "Cross/Offshore",
            WindType::Offshore => "Offshore",
        }
    }
}

impl fmt::Display for WindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Convert km/h to mph, rounded to one decimal.
pub fn kmh_to_mph(kmh: f64) -> f64 {
    (kmh * KMH_TO_MPH * 10.0).round_ties_even() / 10.0
}

/// 16-point compass label for a bearing in degrees.
///
/// Halfway bearings round to the even index (11.25° is `N`).
pub fn deg_to_compass(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round_ties_even() as i64;
    COMPASS_POINTS[index.rem_euclid(16) as usize]
}

/// Shortest angular distance between two bearings, in `0..=180`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Classify wind blowing from `wind_deg` against a beach facing `beach_facing_deg`.
pub fn classify(wind_deg: f64, beach_facing_deg: f64) -> WindType {
    let diff = angular_distance(wind_deg, beach_facing_deg);

    if diff <= 22.5 {
        WindType::Onshore
    } else if diff <= 67.5 {
        WindType::CrossOnshore
    } else if diff <= 112.5 {
        WindType::CrossShore
    } else if diff <= 157.5 {
        WindType::CrossOffshore
    } else {
        WindType::Offshore
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlySeries,
}

/// Open-Meteo returns three parallel arrays; values may be null past the model horizon.
#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    wind_speed_10m: Vec<Option<f64>>,
    wind_direction_10m: Vec<Option<f64>>,
}

fn parse_local_timestamp(raw: &str) -> Result<NaiveDateTime, WindError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| WindError::Timestamp(raw.to_string()))
}

/// Pick today's samples at the requested times of day out of a forecast body.
///
/// A sample is kept when its local `HH:MM` is in `times_to_get` and its date is
/// `today`; matching times from other days are dropped.
pub fn select_samples(
    body: &str,
    times_to_get: &[String],
    today: NaiveDate,
    beach_facing_deg: f64,
) -> Result<Vec<WindSample>, WindError> {
    let forecast: ForecastResponse = serde_json::from_str(body)?;
    let hourly = forecast.hourly;

    if hourly.time.len() != hourly.wind_speed_10m.len()
        || hourly.time.len() != hourly.wind_direction_10m.len()
    {
        warn!(
            times = hourly.time.len(),
            speeds = hourly.wind_speed_10m.len(),
            directions = hourly.wind_direction_10m.len(),
            "Hourly wind arrays differ in length; extra entries ignored"
        );
    }

    let mut selected = Vec::new();
    for ((raw_time, speed), direction) in hourly
        .time
        .iter()
        .zip(&hourly.wind_speed_10m)
        .zip(&hourly.wind_direction_10m)
    {
        let timestamp = parse_local_timestamp(raw_time)?;
        let hhmm = timestamp.format("%H:%M").to_string();
        if timestamp.date() != today || !times_to_get.iter().any(|t| *t == hhmm) {
            continue;
        }

        match (speed, direction) {
            (Some(speed), Some(direction)) => selected.push(WindSample::new(
                timestamp,
                *speed,
                *direction,
                beach_facing_deg,
            )),
            _ => warn!(time = %raw_time, "Wind forecast has no value for requested time"),
        }
    }

    Ok(selected)
}

/// Fetches the hourly wind forecast for one location.
pub struct WindClassifier {
    fetcher: ResilientFetcher,
    api_url: String,
    timezone: String,
}

impl WindClassifier {
    pub fn new(fetcher: ResilientFetcher, api_url: &str, timezone: &str) -> Self {
        WindClassifier {
            fetcher,
            api_url: api_url.to_string(),
            timezone: timezone.to_string(),
        }
    }

    /// Today's wind at `times_to_get`, classified against `beach_facing_deg`.
    ///
    /// `today` defaults to the current local date.
    pub async fn fetch_daily_wind(
        &self,
        latitude: f64,
        longitude: f64,
        beach_facing_deg: f64,
        times_to_get: &[String],
        today: Option<NaiveDate>,
    ) -> Result<Vec<WindSample>, WindError> {
        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let params = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("hourly", "wind_speed_10m,wind_direction_10m".to_string()),
            ("timezone", self.timezone.clone()),
        ];

        let body = self.fetcher.get(&self.api_url, &params).await?;
        let samples = select_samples(&body, times_to_get, today, beach_facing_deg)?;
        info!(count = samples.len(), %today, "Fetched wind forecast");
        Ok(samples)
    }
}
