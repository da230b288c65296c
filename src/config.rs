//! # Configuration Management
//!
//! This module loads the report configuration from a TOML file (`ocean-report.toml`
//! by default). Before parsing, `${NAME}` placeholders are replaced by environment
//! variables, so secrets such as the SMTP app password can live in the environment
//! or in a `.env` file instead of the config file itself.
//!
//! The resulting [`Config`] is built once at process start and passed by reference
//! into each component.

use chrono::NaiveTime;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};
use thiserror::Error;
use tracing::{debug, info};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "ocean-report.toml";

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal and are raised before any network I/O.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `${NAME}` placeholder references an unset environment variable
    #[error("environment variable {0} referenced by config is not set")]
    MissingVariable(String),

    /// A setting required for the requested operation is empty
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Application configuration loaded from ocean-report.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// NOAA tide/temperature station settings
    pub noaa: NoaaConfig,
    /// Beach location and orientation
    pub location: LocationConfig,
    /// Daylight window for tide events
    pub tides: TideWindowConfig,
    /// Wind forecast settings
    pub wind: WindConfig,
    /// SMTP and recipient settings
    pub email: EmailConfig,
    /// Summer season anchors
    pub summer: SummerConfig,
    /// HTTP client settings
    pub http: HttpConfig,
}

/// NOAA CO-OPS station configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NoaaConfig {
    /// Station used for tide predictions and water temperature (e.g. "8534720")
    pub station_id: String,
    /// Human-readable station name, shown in the report footer
    pub station_name: String,
    /// Offshore buoy id, kept for reference
    pub buoy_id: String,
    /// CO-OPS data getter endpoint
    pub api_url: String,
    /// Application name sent to NOAA with each request
    pub application: String,
}

impl Default for NoaaConfig {
    fn default() -> Self {
        NoaaConfig {
            station_id: "8534720".to_string(),
            station_name: "Atlantic City".to_string(),
            buoy_id: "44091".to_string(),
            api_url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string(),
            application: "ocean-report".to_string(),
        }
    }
}

/// Beach location configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Short beach name for log output (e.g. "LBI")
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Compass bearing the shoreline faces, looking out to sea
    pub beach_orientation_degrees: f64,
    /// IANA timezone requested from the wind forecast
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            name: "LBI".to_string(),
            latitude: 39.5,
            longitude: -74.2,
            beach_orientation_degrees: 140.0,
            timezone: "America/New_York".to_string(),
        }
    }
}

/// Daylight window for tide events, in fractional hours (20.5 = 20:30)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TideWindowConfig {
    pub start_hour: f64,
    pub end_hour: f64,
}

impl Default for TideWindowConfig {
    fn default() -> Self {
        TideWindowConfig {
            start_hour: 6.0,
            end_hour: 20.5,
        }
    }
}

/// Wind forecast configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindConfig {
    /// Open-Meteo forecast endpoint
    pub api_url: String,
    /// Local times of day ("HH:MM") to include in the report
    pub times: Vec<String>,
}

impl Default for WindConfig {
    fn default() -> Self {
        WindConfig {
            api_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            times: ["08:00", "12:00", "15:00", "18:00"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// SMTP delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    /// Sender address, also used as the SMTP username
    pub sender: String,
    /// SMTP app password
    pub password: Option<String>,
    /// Visible primary recipient; empty means no visible To
    pub recipient: String,
    /// Subject prefix; the report date is appended
    pub subject: String,
    pub recipient_urls: RecipientUrls,
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: String::new(),
            password: None,
            recipient: String::new(),
            subject: "🌊 Daily Water Report".to_string(),
            recipient_urls: RecipientUrls::default(),
        }
    }
}

/// Plain-text recipient list sources, one per season branch
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RecipientUrls {
    pub main: Option<String>,
    pub offseason: Option<String>,
    pub test: Option<String>,
}

/// Day offsets applied to the Memorial Day and Labor Day season anchors
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummerConfig {
    pub memorial_day_offset: i64,
    pub labor_day_offset: i64,
}

impl Default for SummerConfig {
    fn default() -> Self {
        SummerConfig {
            memorial_day_offset: -4,
            labor_day_offset: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: 10 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// A `.env` file in the working directory is loaded first if present, then
    /// `${NAME}` placeholders are substituted from the process environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "Loaded .env file");
        }

        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&contents, |name| env::var(name).ok())?;
        info!(
            path = %path.display(),
            station = %config.noaa.station_id,
            location = %config.location.name,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration text, resolving placeholders with `lookup`.
    pub fn from_toml_str<F>(contents: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let substituted = substitute_env(contents, lookup)?;
        let config: Config = toml::from_str(&substituted)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that apply to every run, including dry runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = &self.tides;
        for (key, hour) in [
            ("tides.start_hour", window.start_hour),
            ("tides.end_hour", window.end_hour),
        ] {
            if !(0.0..24.0).contains(&hour) {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("{hour} is outside 0..24"),
                });
            }
        }
        if window.start_hour > window.end_hour {
            return Err(ConfigError::Invalid {
                key: "tides.start_hour",
                reason: "window starts after it ends".to_string(),
            });
        }

        // Forecast times are matched as zero-padded text, so "8:00" would never hit
        for time in &self.wind.times {
            let padded = NaiveTime::parse_from_str(time, "%H:%M")
                .map(|parsed| parsed.format("%H:%M").to_string() == *time)
                .unwrap_or(false);
            if !padded {
                return Err(ConfigError::Invalid {
                    key: "wind.times",
                    reason: format!("{time:?} is not zero-padded HH:MM"),
                });
            }
        }

        if !self.location.beach_orientation_degrees.is_finite() {
            return Err(ConfigError::Invalid {
                key: "location.beach_orientation_degrees",
                reason: "not a finite number".to_string(),
            });
        }

        if self.noaa.station_id.trim().is_empty() {
            return Err(ConfigError::MissingSetting("noaa.station_id"));
        }

        Ok(())
    }

    /// Credentials check performed before any network I/O in send mode.
    pub fn validate_for_send(&self) -> Result<(), ConfigError> {
        if self.email.sender.trim().is_empty() {
            return Err(ConfigError::MissingSetting("email.sender"));
        }
        match self.email.password.as_deref() {
            Some(password) if !password.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingSetting("email.password")),
        }
    }
}

/// Replace every `${NAME}` in `text` with `lookup(NAME)`.
///
/// Unset variables are an error rather than silently becoming empty. Values are
/// escaped for a double-quoted TOML string, so a password containing `"` or `\`
/// survives intact; placeholders inside single-quoted literals are not supported.
pub fn substitute_env<F>(text: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
        ConfigError::Invalid {
            key: "placeholder pattern",
            reason: e.to_string(),
        }
    })?;

    let mut missing = None;
    let substituted = pattern.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => escape_basic_string(&value),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::MissingVariable(name)),
        None => Ok(substituted.into_owned()),
    }
}

/// Escape a value for the inside of a TOML basic string.
fn escape_basic_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}
