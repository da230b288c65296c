//! Latest water temperature from a NOAA CO-OPS station.
//!
//! Water temperature is the most optional part of the report: any transport error,
//! missing key or malformed value is logged and reported as absent, never propagated.

use serde::Deserialize;
use tracing::{error, info};

use crate::fetcher::ResilientFetcher;
use crate::Fetched;

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    data: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    v: String,
}

pub struct WaterTempReader {
    fetcher: ResilientFetcher,
    api_url: String,
    application: String,
}

impl WaterTempReader {
    pub fn new(fetcher: ResilientFetcher, api_url: &str, application: &str) -> Self {
        WaterTempReader {
            fetcher,
            api_url: api_url.to_string(),
            application: application.to_string(),
        }
    }

    /// Latest water temperature in °F at `station_id`.
    pub async fn fetch_latest(&self, station_id: &str) -> Fetched<f64> {
        let params = [
            ("product", "water_temperature".to_string()),
            ("application", self.application.clone()),
            ("station", station_id.to_string()),
            ("date", "latest".to_string()),
            ("units", "english".to_string()),
            ("time_zone", "lst_ldt".to_string()),
            ("format", "json".to_string()),
        ];

        let body = match self.fetcher.get(&self.api_url, &params).await {
            Ok(body) => body,
            Err(err) => {
                error!(station_id, error = %err, "Failed to fetch water temperature");
                return Fetched::Failed(err.to_string());
            }
        };

        let reading = parse_latest(&body);
        match &reading {
            Fetched::Ready(temp_f) => info!(station_id, temp_f, "Fetched water temperature"),
            Fetched::Absent => error!(station_id, "No water temperature in response"),
            Fetched::Failed(reason) => {
                error!(station_id, %reason, "Malformed water temperature response")
            }
        }
        reading
    }
}

/// Decode the first observation of a `date=latest` response.
pub fn parse_latest(body: &str) -> Fetched<f64> {
    let response: LatestResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(err) => return Fetched::Failed(err.to_string()),
    };

    match response.data.first() {
        None => Fetched::Absent,
        Some(observation) => match observation.v.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Fetched::Ready(value),
            _ => Fetched::Failed(format!("bad temperature value {:?}", observation.v)),
        },
    }
}
