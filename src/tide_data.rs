//! # NOAA Tide Predictions
//!
//! This module fetches the day's high/low tide predictions from NOAA's CO-OPS data
//! API and restricts them to the daylight hours a beachgoer cares about.
//!
//! ## Data Source
//!
//! ### NOAA Tides and Currents
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Station**: 8534720 (Atlantic City, NJ) by default, configurable
//! - **Product**: `predictions` at `interval=hilo`, so only extrema are returned
//! - **Datum**: MLLW, heights in feet, times in local standard/daylight time
//!
//! ### Response shape
//! ```json
//! {"predictions": [{"t": "2024-07-01 07:00", "v": "0.512", "type": "L"}, ...]}
//! ```
//!
//! ## Error Handling
//!
//! Tides are an optional section. Nothing here escalates:
//! - **Empty predictions**: logged at `error`, returned as [`Fetched::Absent`]
//! - **Network or parse failures**: logged at `error`, returned as [`Fetched::Failed`]

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::fetcher::{FetchError, ResilientFetcher};
use crate::{Fetched, TideEvent, TideKind};

/// Errors that can occur while fetching and decoding tide predictions.
#[derive(Error, Debug)]
pub enum TideError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Body was not the JSON shape we expect
    #[error("malformed tide response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A prediction entry had an unparseable field
    #[error("malformed tide prediction: {0}")]
    Prediction(String),
}

#[derive(Debug, Deserialize)]
struct PredictionsResponse {
    #[serde(default)]
    predictions: Vec<RawPrediction>,
    error: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    t: String,
    v: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Fetches tide extrema for one station and day.
pub struct TideWindowFilter {
    fetcher: ResilientFetcher,
    api_url: String,
    application: String,
}

impl TideWindowFilter {
    pub fn new(fetcher: ResilientFetcher, api_url: &str, application: &str) -> Self {
        TideWindowFilter {
            fetcher,
            api_url: api_url.to_string(),
            application: application.to_string(),
        }
    }

    /// Fetch the high/low predictions for `station_id` on `date`
    /// (today's local date when `None`).
    pub async fn fetch_tides(
        &self,
        station_id: &str,
        date: Option<NaiveDate>,
    ) -> Fetched<Vec<TideEvent>> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());

        match self.try_fetch_tides(station_id, date).await {
            Ok(events) if events.is_empty() => {
                error!(station_id, %date, "No predictions found in tide data response");
                Fetched::Absent
            }
            Ok(events) => {
                info!(station_id, count = events.len(), "Fetched tide predictions");
                Fetched::Ready(events)
            }
            Err(err) => {
                error!(station_id, error = %err, "Failed to fetch tide data");
                Fetched::Failed(err.to_string())
            }
        }
    }

    async fn try_fetch_tides(
        &self,
        station_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TideEvent>, TideError> {
        let day = date.format("%Y%m%d").to_string();
        let params = [
            ("product", "predictions".to_string()),
            ("application", self.application.clone()),
            ("begin_date", day.clone()),
            ("end_date", day),
            ("datum", "MLLW".to_string()),
            ("station", station_id.to_string()),
            ("time_zone", "lst_ldt".to_string()),
            ("units", "english".to_string()),
            ("interval", "hilo".to_string()),
            ("format", "json".to_string()),
        ];

        let body = self.fetcher.get(&self.api_url, &params).await?;
        parse_predictions(&body)
    }
}

/// Decode a CO-OPS `predictions` response into tide events, preserving API order.
pub fn parse_predictions(body: &str) -> Result<Vec<TideEvent>, TideError> {
    let response: PredictionsResponse = serde_json::from_str(body)?;

    if let Some(api_error) = &response.error {
        error!(message = %api_error.message, "NOAA returned an error for tide predictions");
    }

    response
        .predictions
        .iter()
        .map(|raw| {
            let timestamp = NaiveDateTime::parse_from_str(raw.t.trim(), "%Y-%m-%d %H:%M")
                .map_err(|_| TideError::Prediction(format!("bad time {:?}", raw.t)))?;
            let height_ft = raw
                .v
                .trim()
                .parse::<f64>()
                .map_err(|_| TideError::Prediction(format!("bad height {:?}", raw.v)))?;
            let kind = TideKind::from_code(&raw.kind)
                .ok_or_else(|| TideError::Prediction(format!("bad type {:?}", raw.kind)))?;

            Ok(TideEvent {
                timestamp,
                height_ft,
                kind,
            })
        })
        .collect()
}

/// Convert a fractional hour (20.5 = 20:30) to a time of day.
///
/// Minutes are rounded to the nearest whole minute; values at or past midnight
/// saturate to 23:59.
pub fn hour_to_time(hour: f64) -> NaiveTime {
    let whole = hour.floor();
    let minutes = ((hour - whole) * 60.0).round();
    let total = (whole * 60.0 + minutes).clamp(0.0, (23 * 60 + 59) as f64) as u32;
    NaiveTime::from_hms_opt(total / 60, total % 60, 0).unwrap_or_default()
}

/// Keep events whose local time of day lies in `[start_hour, end_hour]`, bounds inclusive.
pub fn filter_daytime(events: &[TideEvent], start_hour: f64, end_hour: f64) -> Vec<TideEvent> {
    let start = hour_to_time(start_hour);
    let end = hour_to_time(end_hour);

    events
        .iter()
        .filter(|event| {
            let time = event.timestamp.time();
            start <= time && time <= end
        })
        .copied()
        .collect()
}
